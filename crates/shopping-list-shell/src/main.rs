//! Interactive shell over a shopping list store.

mod commands;

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};

use commands::{execute, Flow, Line};
use shopping_list::{DocumentStore, MemoryStore, Repository, SqliteStore};

const PROMPT: &str = "shopping-list > ";

#[derive(Parser, Debug)]
#[command(name = "shopping-list", version, about = "Manage shopping lists from the terminal")]
struct Args {
    /// SQLite database file to open or create
    #[arg(long, value_name = "PATH", conflicts_with = "memory")]
    db: Option<PathBuf>,

    /// Keep everything in memory (the default without --db)
    #[arg(long)]
    memory: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.db {
        Some(path) => {
            info!(path = %path.display(), "opening sqlite store");
            run(Repository::new(SqliteStore::open(&path)?)).await
        }
        None => {
            info!("using in-memory store");
            run(Repository::new(MemoryStore::new())).await
        }
    }
}

async fn run<S: DocumentStore>(repo: Repository<S>) -> anyhow::Result<()> {
    repo.ensure_indexes().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", PROMPT);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match Line::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                // Covers `help` as well as malformed input.
                let _ = e.print();
                continue;
            }
        };

        match execute(&repo, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    Ok(())
}
