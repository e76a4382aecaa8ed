use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::error::DemoCallError;

/// An open audio capture that must be released with `stop()`
pub trait CaptureStream: Send {
    /// Stop every track of the capture
    fn stop(&mut self);
}

/// Platform microphone access
///
/// Requesting a capture is what triggers the platform's permission prompt. A denied or
/// failed request surfaces as an error.
#[async_trait::async_trait]
pub trait Microphone: Send + Sync {
    async fn request_capture(&self) -> Result<Box<dyn CaptureStream>>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Confirm microphone permission without holding the device
///
/// The test capture is released before returning, so a denial is reported before any voice
/// connection is attempted.
pub async fn check_permission(microphone: &dyn Microphone) -> Result<(), DemoCallError> {
    match microphone.request_capture().await {
        Ok(mut capture) => {
            capture.stop();
            info!("Microphone permission confirmed ({})", microphone.name());
            Ok(())
        }
        Err(e) => {
            warn!("Microphone request failed ({}): {:#}", microphone.name(), e);
            Err(DemoCallError::MicrophoneDenied)
        }
    }
}

/// Microphone whose permission is decided by configuration
///
/// Used when the real capture happens in a remote front end and this process only mirrors
/// its permission state.
#[derive(Debug, Clone)]
pub struct ConfiguredMicrophone {
    allow: bool,
}

impl ConfiguredMicrophone {
    pub fn new(allow: bool) -> Self {
        Self { allow }
    }
}

/// Nothing is actually opened, so there is nothing to release
struct MirroredCapture;

impl CaptureStream for MirroredCapture {
    fn stop(&mut self) {}
}

#[async_trait::async_trait]
impl Microphone for ConfiguredMicrophone {
    async fn request_capture(&self) -> Result<Box<dyn CaptureStream>> {
        if !self.allow {
            bail!("Microphone permission denied by configuration");
        }
        Ok(Box::new(MirroredCapture))
    }

    fn name(&self) -> &str {
        "configured"
    }
}
