//! Time sources for record timestamps.

use std::sync::{Mutex, PoisonError};

use shopping_list_core::Timestamp;

/// Supplies the instant stamped into `createdAt`/`updatedAt`.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time, truncated to milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. For deterministic tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<Timestamp>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move forward by `millis`. Out-of-range results leave the clock unchanged.
    pub fn advance(&self, millis: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = now
            .as_millis()
            .checked_add(millis)
            .and_then(Timestamp::from_millis)
        {
            *now = next;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(Timestamp::from_millis(1_504_060_808_000).unwrap());
        assert_eq!(clock.now().to_iso_string(), "2017-08-30T02:40:08.000Z");

        clock.advance(1_500);
        assert_eq!(clock.now().to_iso_string(), "2017-08-30T02:40:09.500Z");

        clock.advance(i64::MAX);
        assert_eq!(clock.now().as_millis(), 1_504_060_809_500);
    }

    #[test]
    fn test_system_clock_is_millisecond_precise() {
        let now = SystemClock.now();
        assert_eq!(now.as_datetime().timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
