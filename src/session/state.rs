use serde::{Deserialize, Serialize};
use std::fmt;

use crate::voice::VoiceEvent;

/// Which demo-call view is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallSessionState {
    Idle,
    Loading,
    PreCall,
    Connecting,
    Active,
    PostCall,
    LimitReached,
    Error,
}

impl CallSessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::PreCall => "pre-call",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::PostCall => "post-call",
            Self::LimitReached => "limit-reached",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CallSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who holds the floor during an active call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakingState {
    #[default]
    Idle,
    /// Waiting on the caller
    Listening,
    /// The assistant is talking
    Speaking,
}

impl SpeakingState {
    /// Label for the speaking indicator
    pub fn label(self) -> &'static str {
        match self {
            Self::Speaking => "AI speaking",
            _ => "Listening",
        }
    }
}

/// Actions the demo-call UI offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserAction {
    StartDemo,
    Confirm,
    Cancel,
    ToggleMute,
    EndCall,
    Reset,
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StartDemo => "start demo",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::ToggleMute => "toggle mute",
            Self::EndCall => "end call",
            Self::Reset => "reset",
        })
    }
}

/// Asynchronous input to the session, tagged with the call generation that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Event from the voice connection
    Voice { generation: u64, event: VoiceEvent },
    /// One second of call time elapsed
    Tick { generation: u64 },
    /// The background connection attempt failed
    StartFailed { generation: u64, message: String },
}

/// Everything a view needs to render the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: CallSessionState,

    /// Tenant name once the config is loaded
    pub business_name: Option<String>,

    /// Seconds since the call went live
    pub elapsed_secs: u64,

    /// `elapsed_secs` as `MM:SS`
    pub elapsed_display: String,

    pub speaking: SpeakingState,
    pub muted: bool,

    /// User-facing message while in `error`
    pub error_message: Option<String>,

    /// Demo calls left today
    pub remaining_calls: u32,

    /// Call length limit in whole minutes, once known
    pub max_call_minutes: Option<u32>,
}
