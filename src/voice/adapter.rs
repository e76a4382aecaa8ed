use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::client::{VoiceClient, VoiceClientFactory, VoiceEventSink};
use crate::session::SessionEvent;

/// Exclusive owner of one real-time voice connection
///
/// Wraps a `VoiceClient` with the lifecycle rules the session relies on: a single event
/// subscription, no restart after stop, and a `stop` that is idempotent and never fails.
/// Dropping the session stops it.
pub struct VoiceSession {
    call_id: Uuid,
    generation: u64,
    client: Arc<dyn VoiceClient>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    start_task: Option<JoinHandle<()>>,
    stopped: bool,
}

impl VoiceSession {
    /// Construct the provider client; no network activity yet
    pub async fn create(
        factory: &dyn VoiceClientFactory,
        public_key: &str,
        generation: u64,
    ) -> Result<Self> {
        let client = factory
            .create(public_key)
            .await
            .context("Failed to construct voice client")?;

        let call_id = Uuid::new_v4();
        info!(
            "Voice client ready: {} (call={}, generation={})",
            client.name(),
            call_id,
            generation
        );

        Ok(Self {
            call_id,
            generation,
            client: Arc::from(client),
            events: None,
            start_task: None,
            stopped: false,
        })
    }

    /// Route this connection's events into the session event queue
    pub fn subscribe(&mut self, tx: mpsc::UnboundedSender<SessionEvent>) -> Result<()> {
        if self.events.is_some() {
            bail!("Voice session {} is already subscribed", self.call_id);
        }
        self.client
            .subscribe(VoiceEventSink::new(self.generation, tx.clone()));
        self.events = Some(tx);
        Ok(())
    }

    /// Begin the connection in the background
    ///
    /// Returns as soon as the attempt is under way. The connection announces itself with
    /// `call-start`, which may arrive before the attempt resolves; a failed attempt arrives as
    /// `SessionEvent::StartFailed`.
    pub fn start(&mut self, assistant_id: &str, max_duration_secs: u32) -> Result<()> {
        if self.stopped {
            bail!("Voice session {} was already stopped", self.call_id);
        }
        if self.start_task.is_some() {
            bail!("Voice session {} was already started", self.call_id);
        }
        let Some(tx) = self.events.clone() else {
            bail!("Voice session {} started before subscribing", self.call_id);
        };

        info!("Starting voice call {} (max {}s)", self.call_id, max_duration_secs);

        let client = Arc::clone(&self.client);
        let assistant_id = assistant_id.to_string();
        let (call_id, generation) = (self.call_id, self.generation);

        self.start_task = Some(tokio::spawn(async move {
            if let Err(e) = client.start(&assistant_id, max_duration_secs).await {
                error!("Voice call {} failed to start: {:#}", call_id, e);
                let message = format!("{:#}", e);
                let _ = tx.send(SessionEvent::StartFailed { generation, message });
            }
        }));

        Ok(())
    }

    /// Mute or unmute local audio; ignored once stopped
    pub fn set_muted(&mut self, muted: bool) {
        if self.stopped {
            return;
        }
        self.client.set_muted(muted);
    }

    /// Stop the connection, abandoning a pending start; safe to call repeatedly
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Some(task) = self.start_task.take() {
            task.abort();
        }

        match self.client.stop() {
            Ok(()) => info!("Voice call {} stopped", self.call_id),
            Err(e) => warn!("Ignoring error while stopping voice call {}: {:#}", self.call_id, e),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.stop();
    }
}
