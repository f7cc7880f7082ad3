//! Shell commands: one line of input, parsed with clap.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use shopping_list::core::RecordKind;
use shopping_list::{
    DocumentStore, FindRequest, Repository, Selector, ShoppingListItemValues, ShoppingListValues,
};

/// A single shell input line.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "", disable_version_flag = true)]
pub struct Line {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show all lists
    Lists,

    /// Create a list
    NewList {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        /// Where the shopping happens
        #[arg(long)]
        place: Option<String>,
    },

    /// Show all items, or the items of one list
    Items { list: Option<String> },

    /// Add an item to a list
    AddItem {
        list: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Mark an item checked
    Check { item: String },

    /// Mark an item unchecked
    Uncheck { item: String },

    /// Retitle a list or an item
    Rename {
        id: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Delete a list (with its items) or an item
    Delete { id: String },

    /// Count items per list
    Counts {
        /// Only count checked items
        #[arg(long)]
        checked: bool,
    },

    /// Show one list or item
    Show { id: String },

    /// Show the store's secondary indexes
    Indexes,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Whether the shell should keep reading input.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command and print its result.
pub async fn execute<S: DocumentStore>(repo: &Repository<S>, command: Command) -> anyhow::Result<Flow> {
    let factory = repo.factory();

    match command {
        Command::Lists => print(&repo.find(None).await?)?,
        Command::NewList { title, place } => {
            let mut values = ShoppingListValues::titled(title.join(" "));
            values.place = place;
            print(&repo.post(&factory.new_shopping_list(values)).await?)?;
        }
        Command::Items { list } => {
            let request = list.map(|list| {
                FindRequest::new(Selector::new().equals("type", "item").equals("list", list))
            });
            print(&repo.find_items(request).await?)?;
        }
        Command::AddItem { list, title } => {
            let list = repo.get(&list).await?;
            let item = factory
                .new_shopping_list_item(ShoppingListItemValues::titled(title.join(" ")), Some(&list));
            print(&repo.post_item(&item).await?)?;
        }
        Command::Check { item } => {
            let item = repo.get_item(&item).await?;
            print(&repo.put_item(&item.with_checked(true)).await?)?;
        }
        Command::Uncheck { item } => {
            let item = repo.get_item(&item).await?;
            print(&repo.put_item(&item.with_checked(false)).await?)?;
        }
        Command::Rename { id, title } => match kind_of(repo, &id).await? {
            RecordKind::List => {
                let list = repo.get(&id).await?;
                print(&repo.put(&list.with_title(title.join(" "))).await?)?;
            }
            RecordKind::Item => {
                let item = repo.get_item(&id).await?;
                print(&repo.put_item(&item.with_title(title.join(" "))).await?)?;
            }
        },
        Command::Delete { id } => match kind_of(repo, &id).await? {
            RecordKind::List => print(&repo.delete(&repo.get(&id).await?).await?)?,
            RecordKind::Item => print(&repo.delete_item(&repo.get_item(&id).await?).await?)?,
        },
        Command::Counts { checked } => {
            let mut selector = Selector::new().equals("type", "item");
            if checked {
                selector = selector.equals("checked", true);
            }
            let request = FindRequest::new(selector).fields(["list"]);
            print(&repo.find_items_count_by_list(Some(request)).await?)?;
        }
        Command::Show { id } => match kind_of(repo, &id).await? {
            RecordKind::List => print(&repo.get(&id).await?)?,
            RecordKind::Item => print(&repo.get_item(&id).await?)?,
        },
        Command::Indexes => print(&repo.store().get_indexes().await?)?,
        Command::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

/// The kind of the live record stored under `id`.
async fn kind_of<S: DocumentStore>(repo: &Repository<S>, id: &str) -> anyhow::Result<RecordKind> {
    let doc = repo
        .store()
        .get(id)
        .await?
        .with_context(|| format!("no record with id {}", id))?;

    match doc.get("type").and_then(Value::as_str) {
        Some("list") => Ok(RecordKind::List),
        Some("item") => Ok(RecordKind::Item),
        other => bail!("record {} has unknown type {:?}", id, other),
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopping_list::MemoryStore;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        Line::try_parse_from(line.split_whitespace()).map(|l| l.command)
    }

    #[test]
    fn test_parse_multi_word_titles() {
        assert_eq!(
            parse("new-list Camping Supplies --place Outdoors").unwrap(),
            Command::NewList {
                title: vec!["Camping".into(), "Supplies".into()],
                place: Some("Outdoors".into()),
            }
        );
        assert_eq!(
            parse("counts --checked").unwrap(),
            Command::Counts { checked: true }
        );
        assert_eq!(parse("exit").unwrap(), Command::Quit);
        assert!(parse("new-list").is_err());
        assert!(parse("frobnicate").is_err());
    }

    #[tokio::test]
    async fn test_session() {
        let repo = Repository::new(MemoryStore::new());
        repo.ensure_indexes().await.unwrap();

        let list = repo
            .post(&repo.factory().new_shopping_list(ShoppingListValues::titled("Groceries")))
            .await
            .unwrap();
        let id = list.id().to_string();

        for line in [
            format!("add-item {} Mangos", id),
            format!("add-item {} Pears", id),
            "counts".to_string(),
            format!("rename {} Food", id),
            format!("show {}", id),
        ] {
            let command = parse(&line).unwrap();
            assert_eq!(execute(&repo, command).await.unwrap(), Flow::Continue);
        }

        assert_eq!(repo.get(&id).await.unwrap().title(), Some("Food"));
        let counts = repo.find_items_count_by_list(None).await.unwrap();
        assert_eq!(counts.get(list.id()), Some(&2));

        let command = parse(&format!("delete {}", id)).unwrap();
        execute(&repo, command).await.unwrap();
        assert!(repo.find_items(None).await.unwrap().is_empty());

        assert_eq!(execute(&repo, Command::Quit).await.unwrap(), Flow::Quit);
    }
}
