use thiserror::Error;

use crate::session::{CallSessionState, UserAction};

const UNAVAILABLE_MESSAGE: &str = "Demo is currently unavailable";
const INCOMPLETE_MESSAGE: &str = "Demo is not fully configured yet.";
const UNREACHABLE_MESSAGE: &str =
    "Could not reach demo server. Check that the demo config URL is set correctly.";
const MICROPHONE_MESSAGE: &str = "Microphone access is needed for the demo call";
const CONNECTION_MESSAGE: &str = "Connection failed. Please try again.";

/// Failures that end a demo call attempt in the `error` state
///
/// None of these are fatal: the controller records the user-facing message and waits for an
/// explicit reset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DemoCallError {
    /// The config request never produced a usable response (network, DNS, TLS, bad body)
    #[error("demo config endpoint unreachable: {0}")]
    ConfigUnreachable(String),

    /// The config endpoint answered with a non-success status
    #[error("demo config unavailable: {0}")]
    ConfigUnavailable(String),

    /// The config response lacks an assistant ID or public key
    #[error("demo config is missing assistantId or vapiPublicKey")]
    ConfigIncomplete,

    #[error("microphone access denied")]
    MicrophoneDenied,

    /// Constructing or starting the voice client failed
    #[error("voice connection failed: {0}")]
    ConnectionFailed(String),

    /// The voice client reported an error mid-call
    #[error("voice session error: {0}")]
    RuntimeVoiceError(String),
}

impl DemoCallError {
    /// Message shown in the error view
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigUnavailable(message) if !message.is_empty() => message.clone(),
            Self::ConfigUnavailable(_) => UNAVAILABLE_MESSAGE.to_string(),
            Self::ConfigIncomplete => INCOMPLETE_MESSAGE.to_string(),
            Self::ConfigUnreachable(_) => UNREACHABLE_MESSAGE.to_string(),
            Self::MicrophoneDenied => MICROPHONE_MESSAGE.to_string(),
            Self::ConnectionFailed(_) | Self::RuntimeVoiceError(_) => {
                CONNECTION_MESSAGE.to_string()
            }
        }
    }
}

/// A user action that is not valid in the current session state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {action} while session is {state}")]
pub struct ActionRejected {
    pub action: UserAction,
    pub state: CallSessionState,
}
