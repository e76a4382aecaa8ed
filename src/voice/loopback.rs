// Loopback voice provider: a scripted call that never leaves the process

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

use super::client::{LoopbackTiming, VoiceClient, VoiceClientFactory, VoiceEvent, VoiceEventSink};

/// Creates `LoopbackVoiceClient`s
#[derive(Debug, Clone, Default)]
pub struct LoopbackVoiceFactory {
    timing: LoopbackTiming,
}

impl LoopbackVoiceFactory {
    pub fn new(timing: LoopbackTiming) -> Self {
        Self { timing }
    }
}

#[async_trait::async_trait]
impl VoiceClientFactory for LoopbackVoiceFactory {
    async fn create(&self, public_key: &str) -> Result<Box<dyn VoiceClient>> {
        if public_key.trim().is_empty() {
            bail!("Voice provider public key is empty");
        }
        Ok(Box::new(LoopbackVoiceClient::new(self.timing)))
    }
}

/// Local voice client
///
/// Once started it fires `call-start`, speaks a greeting (`speech-start`/`speech-end`) and
/// ends the call with `call-end` when the maximum duration elapses. A local `stop` also
/// fires `call-end`, like a hosted provider does.
pub struct LoopbackVoiceClient {
    timing: LoopbackTiming,
    events: Mutex<Option<VoiceEventSink>>,
    call_task: Mutex<Option<JoinHandle<()>>>,
    muted: AtomicBool,
}

// Guarded values stay consistent even if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LoopbackVoiceClient {
    pub fn new(timing: LoopbackTiming) -> Self {
        Self {
            timing,
            events: Mutex::new(None),
            call_task: Mutex::new(None),
            muted: AtomicBool::new(false),
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VoiceClient for LoopbackVoiceClient {
    fn subscribe(&self, events: VoiceEventSink) {
        *lock(&self.events) = Some(events);
    }

    async fn start(&self, assistant_id: &str, max_duration_secs: u32) -> Result<()> {
        if assistant_id.trim().is_empty() {
            bail!("Assistant ID is empty");
        }
        let Some(events) = lock(&self.events).clone() else {
            bail!("Voice client started without an event subscription");
        };

        let mut call_task = lock(&self.call_task);
        if call_task.is_some() {
            bail!("Call already started");
        }

        info!(
            "Loopback call to assistant {} (max {}s)",
            assistant_id, max_duration_secs
        );

        let timing = self.timing;
        let deadline = Instant::now() + Duration::from_secs(u64::from(max_duration_secs));

        *call_task = Some(tokio::spawn(async move {
            events.emit(VoiceEvent::CallStart);

            let greeting = async {
                tokio::time::sleep(timing.greeting_delay).await;
                events.emit(VoiceEvent::SpeechStart);
                tokio::time::sleep(timing.greeting_length).await;
                events.emit(VoiceEvent::SpeechEnd);
            };
            let _ = tokio::time::timeout_at(deadline, greeting).await;

            tokio::time::sleep_until(deadline).await;
            info!("Loopback call reached its maximum duration");
            events.emit(VoiceEvent::CallEnd);
        }));

        Ok(())
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
        info!("Loopback microphone {}", if muted { "muted" } else { "unmuted" });
    }

    fn stop(&self) -> Result<()> {
        let Some(task) = lock(&self.call_task).take() else {
            return Ok(());
        };

        task.abort();
        if let Some(events) = lock(&self.events).as_ref() {
            events.emit(VoiceEvent::CallEnd);
        }
        info!("Loopback call stopped");

        Ok(())
    }

    fn name(&self) -> &str {
        "loopback"
    }
}

impl Drop for LoopbackVoiceClient {
    fn drop(&mut self) {
        let call_task = self
            .call_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = call_task.take() {
            task.abort();
        }
    }
}
