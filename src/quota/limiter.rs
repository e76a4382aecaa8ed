use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::store::KeyValueStore;

/// Storage key holding the persisted `RateLimitRecord`
pub const STORAGE_KEY: &str = "voxli_demo_calls";

/// Demo calls allowed per calendar day
pub const MAX_DAILY_CALLS: u32 = 3;

/// Persisted quota usage: `{"count": 2, "date": "2025-10-28"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Calls started (not necessarily completed) on `date`
    pub count: u32,

    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
}

impl RateLimitRecord {
    fn empty(today: NaiveDate) -> Self {
        Self {
            count: 0,
            date: day_string(today),
        }
    }
}

fn day_string(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Calls counted against `today`, given whatever is in storage
///
/// A record from another day counts as zero. Storage is not touched.
pub fn effective_count(stored: Option<&RateLimitRecord>, today: NaiveDate) -> u32 {
    match stored {
        Some(record) if record.date == day_string(today) => record.count,
        _ => 0,
    }
}

type TodayFn = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Daily per-browser call limiter
///
/// Reads and writes are not atomic across processes; two daemons sharing a store can both
/// spend the last call. The limit is soft.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    today: TodayFn,
}

impl RateLimiter {
    /// Limiter keyed on the current UTC calendar day
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_today(store, || Utc::now().date_naive())
    }

    /// Limiter with an injected calendar (tests, replays)
    pub fn with_today(
        store: Arc<dyn KeyValueStore>,
        today: impl Fn() -> NaiveDate + Send + Sync + 'static,
    ) -> Self {
        Self {
            store,
            today: Arc::new(today),
        }
    }

    /// Whether today's quota is exhausted
    pub fn is_limited(&self) -> bool {
        self.current_count() >= MAX_DAILY_CALLS
    }

    /// Calls left today
    pub fn remaining(&self) -> u32 {
        MAX_DAILY_CALLS.saturating_sub(self.current_count())
    }

    /// Record one started call
    ///
    /// Never fails: a storage error is logged and the call goes uncounted.
    pub fn increment(&self) {
        let today = (self.today)();
        let record = RateLimitRecord {
            count: effective_count(self.load().as_ref(), today).saturating_add(1),
            date: day_string(today),
        };

        let encoded = match serde_json::to_string(&record) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode rate limit record: {}", e);
                return;
            }
        };

        match self.store.set(STORAGE_KEY, &encoded) {
            Ok(()) => debug!("Demo calls today: {}/{}", record.count, MAX_DAILY_CALLS),
            Err(e) => warn!("Failed to persist rate limit record: {:#}", e),
        }
    }

    /// Effective record for today (zeroed if stale, absent or corrupt)
    pub fn record(&self) -> RateLimitRecord {
        let today = (self.today)();
        match self.load() {
            Some(record) if effective_count(Some(&record), today) > 0 => record,
            _ => RateLimitRecord::empty(today),
        }
    }

    fn current_count(&self) -> u32 {
        effective_count(self.load().as_ref(), (self.today)())
    }

    fn load(&self) -> Option<RateLimitRecord> {
        let raw = match self.store.get(STORAGE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read rate limit record: {:#}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring corrupt rate limit record: {}", e);
                None
            }
        }
    }
}
