use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::loopback::LoopbackVoiceFactory;
use crate::session::SessionEvent;

/// Out-of-band events from a real-time voice connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// The connection is live; the only trusted "connected" signal
    CallStart,
    /// The call is over, whoever ended it
    CallEnd,
    /// The assistant started talking
    SpeechStart,
    /// The assistant stopped talking
    SpeechEnd,
    /// Provider-side failure
    Error(String),
}

/// Where a voice client delivers its events
///
/// Each sink is bound to one voice handle; the controller drops events whose handle has
/// been cleaned up.
#[derive(Debug, Clone)]
pub struct VoiceEventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl VoiceEventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn emit(&self, event: VoiceEvent) {
        let generation = self.generation;
        if self.tx.send(SessionEvent::Voice { generation, event }).is_err() {
            debug!("Session gone, dropping voice event (generation={})", generation);
        }
    }
}

/// Real-time voice client trait
///
/// Implementations:
/// - `LoopbackVoiceClient`: local provider that scripts a call (development, daemon default)
/// - test doubles in the session tests
///
/// Construction (`VoiceClientFactory::create`) must not touch the network; the connection
/// begins with `start`.
///
/// `start` may still be pending when the client fires `call-start`, and `stop`/`set_muted`
/// must work while it is, so every method takes `&self`.
#[async_trait::async_trait]
pub trait VoiceClient: Send + Sync {
    /// Register the event sink; called once, before `start`
    fn subscribe(&self, events: VoiceEventSink);

    /// Begin the connection to `assistant_id`, ending it after `max_duration_secs`
    async fn start(&self, assistant_id: &str, max_duration_secs: u32) -> Result<()>;

    /// Toggle local audio transmission
    fn set_muted(&self, muted: bool);

    /// Tear the connection down
    fn stop(&self) -> Result<()>;

    /// Get client name for logging
    fn name(&self) -> &str;
}

/// Builds voice clients from the provider's public key
#[async_trait::async_trait]
pub trait VoiceClientFactory: Send + Sync {
    async fn create(&self, public_key: &str) -> Result<Box<dyn VoiceClient>>;
}

/// Voice provider selected in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceProvider {
    /// In-process scripted call
    Loopback,
}

/// Timing knobs for the loopback provider
#[derive(Debug, Clone, Copy)]
pub struct LoopbackTiming {
    /// Pause between call start and the greeting
    pub greeting_delay: Duration,
    /// How long the greeting "speaks"
    pub greeting_length: Duration,
}

impl Default for LoopbackTiming {
    fn default() -> Self {
        Self {
            greeting_delay: Duration::from_millis(600),
            greeting_length: Duration::from_millis(2_500),
        }
    }
}

impl VoiceProvider {
    /// Factory for this provider
    pub fn factory(self, timing: LoopbackTiming) -> Arc<dyn VoiceClientFactory> {
        match self {
            VoiceProvider::Loopback => Arc::new(LoopbackVoiceFactory::new(timing)),
        }
    }
}
