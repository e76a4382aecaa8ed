mod common;

use common::{record_calls, today};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use voxli_demo::voice::{LoopbackTiming, LoopbackVoiceFactory};
use voxli_demo::{
    CallSessionState, ConfiguredMicrophone, HttpConfigFetcher, MemoryStore, RateLimiter,
    SessionController, SessionDeps, SpeakingState, MAX_DAILY_CALLS,
};

const CONFIG_PATH: &str = "/api/widget/demo-config";

struct Scenario {
    store: Arc<MemoryStore>,
    limiter: RateLimiter,
    microphone_allowed: bool,
}

impl Scenario {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::with_today(store.clone(), today);
        Self {
            store,
            limiter,
            microphone_allowed: true,
        }
    }

    fn session(&self, server: &MockServer) -> (SessionController, voxli_demo::session::SessionEvents) {
        let fetcher = HttpConfigFetcher::new(server.url(CONFIG_PATH), 2_000).unwrap();
        let timing = LoopbackTiming {
            greeting_delay: Duration::from_millis(200),
            greeting_length: Duration::from_secs(2),
        };

        SessionController::new(SessionDeps {
            config_source: Arc::new(fetcher),
            microphone: Arc::new(ConfiguredMicrophone::new(self.microphone_allowed)),
            voice: Arc::new(LoopbackVoiceFactory::new(timing)),
            limiter: self.limiter.clone(),
        })
    }
}

fn mock_acme(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path(CONFIG_PATH);
        then.status(200).json_body(json!({
            "businessName": "Acme",
            "assistantId": "a1",
            "vapiPublicKey": "k1",
            "maxDurationSeconds": 120
        }));
    })
}

#[tokio::test]
async fn test_acme_call_runs_to_one_minute_five() {
    let server = MockServer::start();
    let mock = mock_acme(&server);
    let scenario = Scenario::new();
    let (mut controller, mut events) = scenario.session(&server);

    controller.start_demo().await.unwrap();
    assert_eq!(controller.state(), CallSessionState::PreCall);
    assert_eq!(controller.snapshot().business_name.as_deref(), Some("Acme"));
    mock.assert_calls(1);

    // No more network from here on; let the clock run itself
    tokio::time::pause();

    controller.confirm().await.unwrap();
    assert_eq!(controller.state(), CallSessionState::Connecting);

    while controller.state() == CallSessionState::Connecting {
        let event = events.recv().await.unwrap();
        controller.handle_event(event);
    }
    assert_eq!(controller.state(), CallSessionState::Active);
    assert_eq!(controller.elapsed_secs(), 0);

    while controller.elapsed_secs() < 65 {
        let event = events.recv().await.unwrap();
        controller.handle_event(event);
    }

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, CallSessionState::Active);
    assert_eq!(snapshot.elapsed_display, "01:05");
    assert_eq!(snapshot.speaking, SpeakingState::Listening);
    assert_eq!(snapshot.remaining_calls, MAX_DAILY_CALLS - 1);

    controller.end_call().unwrap();
    assert_eq!(controller.state(), CallSessionState::PostCall);
    assert!(!controller.has_live_call());
}

#[tokio::test]
async fn test_loopback_call_ends_itself_at_max_duration() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(CONFIG_PATH);
        then.status(200).json_body(json!({
            "businessName": "Acme",
            "assistantId": "a1",
            "vapiPublicKey": "k1",
            "maxDurationSeconds": 5
        }));
    });
    let scenario = Scenario::new();
    let (mut controller, mut events) = scenario.session(&server);

    controller.start_demo().await.unwrap();
    tokio::time::pause();
    controller.confirm().await.unwrap();

    while controller.state() != CallSessionState::PostCall {
        let event = events.recv().await.unwrap();
        controller.handle_event(event);
    }

    assert!(controller.error().is_none());
    assert!(controller.elapsed_secs() >= 4);
    assert!(!controller.timer_running());
}

#[tokio::test]
async fn test_server_error_message_is_shown() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path(CONFIG_PATH);
        then.status(500).json_body(json!({ "error": "maintenance" }));
    });
    let scenario = Scenario::new();
    let (mut controller, _events) = scenario.session(&server);

    controller.start_demo().await.unwrap();

    assert_eq!(controller.state(), CallSessionState::Error);
    assert_eq!(
        controller.snapshot().error_message.as_deref(),
        Some("maintenance")
    );
    assert_eq!(scenario.limiter.remaining(), MAX_DAILY_CALLS);
    mock.assert_calls(1);
}

#[tokio::test]
async fn test_limit_reached_skips_config_fetch() {
    let server = MockServer::start();
    let mock = mock_acme(&server);
    let scenario = Scenario::new();
    record_calls(&scenario.store, MAX_DAILY_CALLS);
    let (mut controller, _events) = scenario.session(&server);

    controller.start_demo().await.unwrap();

    assert_eq!(controller.state(), CallSessionState::LimitReached);
    mock.assert_calls(0);
}

#[tokio::test]
async fn test_quota_used_up_elsewhere_is_noticed_on_start() {
    let server = MockServer::start();
    let mock = mock_acme(&server);
    let scenario = Scenario::new();
    let (mut controller, _events) = scenario.session(&server);
    assert_eq!(controller.state(), CallSessionState::Idle);

    // Another tab spends the rest of today's quota
    record_calls(&scenario.store, MAX_DAILY_CALLS);

    controller.start_demo().await.unwrap();

    assert_eq!(controller.state(), CallSessionState::LimitReached);
    mock.assert_calls(0);
}

#[tokio::test]
async fn test_microphone_denied_leaves_quota_unspent() {
    let server = MockServer::start();
    mock_acme(&server);
    let mut scenario = Scenario::new();
    scenario.microphone_allowed = false;
    let (mut controller, _events) = scenario.session(&server);

    controller.start_demo().await.unwrap();
    controller.confirm().await.unwrap();

    assert_eq!(controller.state(), CallSessionState::Error);
    assert!(!scenario.limiter.is_limited());
    assert_eq!(scenario.limiter.remaining(), MAX_DAILY_CALLS);
    assert_eq!(scenario.limiter.record().count, 0);
}
