//! Waitlist email capture
//!
//! Insert-only signup store. The hosted backing table enforces uniqueness on the email; the
//! store reports a repeat signup as `WaitlistError::Duplicate` so the UI can say "already on
//! the list" instead of failing.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitlistError {
    #[error("email address is empty")]
    InvalidEmail,

    #[error("email address is already on the waitlist")]
    Duplicate,
}

/// Trim and lower-case an address; `None` when nothing is left
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_lowercase();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[async_trait::async_trait]
pub trait WaitlistStore: Send + Sync {
    /// Add an address; returns the normalised form that was stored
    async fn insert(&self, email: &str) -> Result<String, WaitlistError>;
}

/// Process-local waitlist
#[derive(Debug, Default)]
pub struct MemoryWaitlist {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryWaitlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait::async_trait]
impl WaitlistStore for MemoryWaitlist {
    async fn insert(&self, email: &str) -> Result<String, WaitlistError> {
        let email = normalize_email(email).ok_or(WaitlistError::InvalidEmail)?;

        let mut entries = self.entries.write().await;
        if entries.contains_key(&email) {
            return Err(WaitlistError::Duplicate);
        }
        entries.insert(email.clone(), Utc::now());

        info!("Waitlist signup ({} total)", entries.len());
        Ok(email)
    }
}
