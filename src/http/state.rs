use crate::session::SessionHandle;
use crate::waitlist::WaitlistStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one demo-call session this process hosts
    pub session: SessionHandle,

    /// Waitlist signups
    pub waitlist: Arc<dyn WaitlistStore>,
}

impl AppState {
    pub fn new(session: SessionHandle, waitlist: Arc<dyn WaitlistStore>) -> Self {
        Self { session, waitlist }
    }
}
