//! HTTP control API for a demo-call front end
//!
//! This module exposes the session's UI actions as a REST API:
//! - GET /demo - Current session snapshot
//! - POST /demo/start - Start a demo (fetches config or reports the limit)
//! - POST /demo/confirm - Confirm and connect
//! - POST /demo/cancel - Back out of the confirmation
//! - POST /demo/mute - Toggle microphone mute
//! - POST /demo/end - Hang up
//! - POST /demo/reset - Return to idle after a call or error
//! - POST /waitlist - Join the waitlist
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, JoinWaitlistRequest, JoinWaitlistResponse};
pub use routes::create_router;
pub use state::AppState;
