//! Process-wide "stock last refreshed" timestamp.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

const UNSET: i64 = i64::MIN;

/// A single atomic timestamp slot, shared by the catalog client and the
/// stock refresher.
///
/// Stored as Unix milliseconds. Reads that find it empty initialise it to
/// the current time; after that it is only ever overwritten.
#[derive(Debug)]
pub struct LastUpdate {
    millis: AtomicI64,
}

impl LastUpdate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            millis: AtomicI64::new(UNSET),
        }
    }

    /// Record a successful refresh at `at`.
    pub fn record(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::Release);
    }

    /// The recorded time, without initialising it.
    #[must_use]
    pub fn peek(&self) -> Option<DateTime<Utc>> {
        match self.millis.load(Ordering::Acquire) {
            UNSET => None,
            millis => DateTime::from_timestamp_millis(millis),
        }
    }

    /// The recorded time, initialised to now if nothing was recorded yet.
    pub fn get_or_init(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let stored = match self.millis.compare_exchange(
            UNSET,
            now.timestamp_millis(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return now,
            Err(existing) => existing,
        };

        DateTime::from_timestamp_millis(stored).unwrap_or(now)
    }
}

impl Default for LastUpdate {
    fn default() -> Self {
        Self::new()
    }
}
