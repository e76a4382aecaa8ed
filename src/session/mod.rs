//! Demo-call session management
//!
//! This module provides the `SessionController` state machine that manages:
//! - Config fetch and the daily call quota
//! - Microphone permission before connecting
//! - The voice connection lifecycle and its events
//! - Elapsed call time and speaking indicators
//! - Cleanup of the connection and timer on every exit path

mod config;
mod controller;
mod driver;
mod state;
mod timer;

pub use config::{CallConfig, DEFAULT_MAX_DURATION_SECS};
pub use controller::{SessionController, SessionDeps, SessionEvents};
pub use driver::SessionHandle;
pub use state::{CallSessionState, SessionEvent, SessionSnapshot, SpeakingState, UserAction};
pub use timer::{format_elapsed, ElapsedTimer};
