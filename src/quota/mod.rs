//! Daily demo-call quota
//!
//! The quota is advisory and lives in local persistent storage, mirroring the browser's
//! `localStorage`. It is not a security boundary: clearing the store resets it.

mod limiter;
mod store;

pub use limiter::{effective_count, RateLimitRecord, RateLimiter, MAX_DAILY_CALLS, STORAGE_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
