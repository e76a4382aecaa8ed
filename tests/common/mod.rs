// Test doubles for the demo-call session
//
// A stub config source, a scriptable voice provider and an in-memory quota store, so the
// state machine runs without network or audio hardware.

#![allow(dead_code)]

use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voxli_demo::quota::STORAGE_KEY;
use voxli_demo::session::SessionEvents;
use voxli_demo::voice::VoiceEventSink;
use voxli_demo::{
    CallConfig, ConfigSource, ConfiguredMicrophone, DemoCallError, KeyValueStore, MemoryStore,
    RateLimiter, SessionController, SessionDeps, VoiceClient, VoiceClientFactory, VoiceEvent,
};

pub const TODAY: &str = "2025-10-28";

pub fn today() -> NaiveDate {
    NaiveDate::parse_from_str(TODAY, "%Y-%m-%d").unwrap()
}

pub fn acme_config() -> CallConfig {
    CallConfig {
        business_name: "Acme".to_string(),
        assistant_id: "a1".to_string(),
        api_key: "k1".to_string(),
        max_duration_seconds: 120,
    }
}

/// Config source returning a canned result
pub struct StubConfigSource {
    result: Mutex<Result<CallConfig, DemoCallError>>,
    pub calls: AtomicUsize,
}

impl StubConfigSource {
    pub fn ok(config: CallConfig) -> Self {
        Self {
            result: Mutex::new(Ok(config)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: DemoCallError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConfigSource for StubConfigSource {
    async fn fetch_config(&self) -> Result<CallConfig, DemoCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}

/// Shared view into every voice client the fake factory built
#[derive(Default)]
pub struct VoiceSpy {
    sinks: Mutex<Vec<VoiceEventSink>>,
    pub created: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub mute_calls: Mutex<Vec<bool>>,
    pub fail_create: AtomicBool,
    pub fail_start: AtomicBool,
    /// `start` fires call-start, then stays pending for 30 s
    pub hang_start: AtomicBool,
}

impl VoiceSpy {
    /// Fire an event from the most recently built client
    pub fn emit(&self, event: VoiceEvent) {
        let sinks = self.sinks.lock().unwrap();
        sinks.last().expect("no voice client subscribed").emit(event);
    }

    /// Fire an event from the `index`-th client built (0-based)
    pub fn emit_from(&self, index: usize, event: VoiceEvent) {
        let sinks = self.sinks.lock().unwrap();
        sinks[index].emit(event);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct FakeVoiceFactory {
    pub spy: Arc<VoiceSpy>,
}

#[async_trait::async_trait]
impl VoiceClientFactory for FakeVoiceFactory {
    async fn create(&self, _public_key: &str) -> Result<Box<dyn VoiceClient>> {
        if self.spy.fail_create.load(Ordering::SeqCst) {
            bail!("voice SDK failed to load");
        }
        self.spy.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeVoiceClient {
            spy: Arc::clone(&self.spy),
            sink: Mutex::new(None),
            started: AtomicBool::new(false),
        }))
    }
}

struct FakeVoiceClient {
    spy: Arc<VoiceSpy>,
    sink: Mutex<Option<VoiceEventSink>>,
    started: AtomicBool,
}

#[async_trait::async_trait]
impl VoiceClient for FakeVoiceClient {
    fn subscribe(&self, events: VoiceEventSink) {
        self.spy.sinks.lock().unwrap().push(events.clone());
        *self.sink.lock().unwrap() = Some(events);
    }

    async fn start(&self, _assistant_id: &str, _max_duration_secs: u32) -> Result<()> {
        self.spy.starts.fetch_add(1, Ordering::SeqCst);
        if self.spy.fail_start.load(Ordering::SeqCst) {
            bail!("websocket handshake rejected");
        }
        self.started.store(true, Ordering::SeqCst);

        if self.spy.hang_start.load(Ordering::SeqCst) {
            let sink = self.sink.lock().unwrap().clone();
            if let Some(sink) = sink {
                sink.emit(VoiceEvent::CallStart);
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(())
    }

    fn set_muted(&self, muted: bool) {
        self.spy.mute_calls.lock().unwrap().push(muted);
    }

    fn stop(&self) -> Result<()> {
        self.spy.stops.fetch_add(1, Ordering::SeqCst);
        // Hosted providers confirm a local hang-up with call-end
        if self.started.load(Ordering::SeqCst) {
            if let Some(sink) = self.sink.lock().unwrap().as_ref() {
                sink.emit(VoiceEvent::CallEnd);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct Harness {
    pub controller: SessionController,
    pub events: SessionEvents,
    pub voice: Arc<VoiceSpy>,
    pub config_source: Arc<StubConfigSource>,
    pub store: Arc<MemoryStore>,
    pub limiter: RateLimiter,
}

pub struct HarnessBuilder {
    config_source: StubConfigSource,
    microphone_allowed: bool,
    prior_calls_today: u32,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config_source: StubConfigSource::ok(acme_config()),
            microphone_allowed: true,
            prior_calls_today: 0,
        }
    }

    pub fn config_source(mut self, source: StubConfigSource) -> Self {
        self.config_source = source;
        self
    }

    pub fn deny_microphone(mut self) -> Self {
        self.microphone_allowed = false;
        self
    }

    pub fn prior_calls_today(mut self, count: u32) -> Self {
        self.prior_calls_today = count;
        self
    }

    pub fn build(self) -> Harness {
        let store = Arc::new(MemoryStore::new());
        if self.prior_calls_today > 0 {
            record_calls(&store, self.prior_calls_today);
        }

        let limiter = RateLimiter::with_today(store.clone(), today);
        let voice = Arc::new(VoiceSpy::default());
        let config_source = Arc::new(self.config_source);

        let deps = SessionDeps {
            config_source: config_source.clone(),
            microphone: Arc::new(ConfiguredMicrophone::new(self.microphone_allowed)),
            voice: Arc::new(FakeVoiceFactory {
                spy: Arc::clone(&voice),
            }),
            limiter: limiter.clone(),
        };

        let (controller, events) = SessionController::new(deps);

        Harness {
            controller,
            events,
            voice,
            config_source,
            store,
            limiter,
        }
    }
}

/// Write a quota record for today, as if `count` calls had already started
pub fn record_calls(store: &MemoryStore, count: u32) {
    store
        .set(
            STORAGE_KEY,
            &format!(r#"{{"count":{},"date":"{}"}}"#, count, TODAY),
        )
        .unwrap();
}

impl Harness {
    /// Apply every event already queued
    pub fn drain(&mut self) {
        while let Some(event) = self.events.try_recv() {
            self.controller.handle_event(event);
        }
    }

    /// Wait for the next event and apply it
    pub async fn pump(&mut self) {
        let event = self.events.recv().await.expect("event channel closed");
        self.controller.handle_event(event);
    }

    /// Let background tasks (the connection attempt) run
    pub async fn settle(&self) {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    /// Drive the session from idle to an active call
    pub async fn go_active(&mut self) {
        self.controller.start_demo().await.unwrap();
        self.controller.confirm().await.unwrap();
        self.settle().await;
        self.voice.emit(VoiceEvent::CallStart);
        self.drain();
    }
}
