use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::config::CallConfig;
use super::state::{CallSessionState, SessionEvent, SessionSnapshot, SpeakingState, UserAction};
use super::timer::{format_elapsed, ElapsedTimer};
use crate::audio::{check_permission, ConfiguredMicrophone, Microphone};
use crate::config::Config;
use crate::demo_config::{ConfigSource, HttpConfigFetcher};
use crate::error::{ActionRejected, DemoCallError};
use crate::quota::{FileStore, RateLimiter};
use crate::voice::{LoopbackTiming, VoiceClientFactory, VoiceEvent, VoiceSession};

/// Collaborators the session controller drives
#[derive(Clone)]
pub struct SessionDeps {
    pub config_source: Arc<dyn ConfigSource>,
    pub microphone: Arc<dyn Microphone>,
    pub voice: Arc<dyn VoiceClientFactory>,
    pub limiter: RateLimiter,
}

impl SessionDeps {
    /// Wire the production collaborators from service configuration
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let fetcher = HttpConfigFetcher::new(&cfg.demo.config_url, cfg.demo.request_timeout_ms)?;
        info!("Demo config URL: {}", fetcher.url());
        let store = FileStore::new(PathBuf::from(&cfg.storage.path));
        let timing = LoopbackTiming {
            greeting_delay: Duration::from_millis(cfg.voice.greeting_delay_ms),
            greeting_length: Duration::from_millis(cfg.voice.greeting_length_ms),
        };

        Ok(Self {
            config_source: Arc::new(fetcher),
            microphone: Arc::new(ConfiguredMicrophone::new(cfg.microphone.allow)),
            voice: cfg.voice.provider.factory(timing),
            limiter: RateLimiter::new(Arc::new(store)),
        })
    }
}

/// Receiving end of the session's event queue (voice events and timer ticks)
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

/// The two live resources of a call, owned together
struct ActiveCall {
    voice: VoiceSession,
    timer: Option<ElapsedTimer>,
}

/// Demo-call state machine
///
/// Single owner of the voice connection and the elapsed timer. Every exit from
/// `connecting`/`active` goes through `cleanup`, which stops the timer and then the
/// connection, and can run any number of times.
///
/// Actions are `async` and hold `&mut self` across their suspension points, so a second
/// action cannot interleave with one in flight. Events queued meanwhile are applied
/// afterwards through `handle_event`. The voice connection attempt itself runs in the
/// background, so `call-start` and teardown are never held up behind it.
pub struct SessionController {
    deps: SessionDeps,
    state: CallSessionState,
    config: Option<CallConfig>,
    speaking: SpeakingState,
    muted: bool,
    elapsed_secs: u64,
    error: Option<DemoCallError>,
    call: Option<ActiveCall>,
    next_generation: u64,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    /// Create a session; an exhausted quota opens it in `limit-reached`
    pub fn new(deps: SessionDeps) -> (Self, SessionEvents) {
        let (events_tx, rx) = mpsc::unbounded_channel();

        let state = if deps.limiter.is_limited() {
            CallSessionState::LimitReached
        } else {
            CallSessionState::Idle
        };

        let (snapshots, _) = watch::channel(SessionSnapshot {
            state,
            business_name: None,
            elapsed_secs: 0,
            elapsed_display: format_elapsed(0),
            speaking: SpeakingState::Idle,
            muted: false,
            error_message: None,
            remaining_calls: deps.limiter.remaining(),
            max_call_minutes: None,
        });

        let controller = Self {
            deps,
            state,
            config: None,
            speaking: SpeakingState::Idle,
            muted: false,
            elapsed_secs: 0,
            error: None,
            call: None,
            next_generation: 1,
            events_tx,
            snapshots,
        };

        (controller, SessionEvents { rx })
    }

    pub fn state(&self) -> CallSessionState {
        self.state
    }

    pub fn speaking(&self) -> SpeakingState {
        self.speaking
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn error(&self) -> Option<&DemoCallError> {
        self.error.as_ref()
    }

    pub fn call_config(&self) -> Option<&CallConfig> {
        self.config.as_ref()
    }

    /// Whether a voice connection is currently owned
    pub fn has_live_call(&self) -> bool {
        self.call.is_some()
    }

    /// Whether the elapsed timer is ticking
    pub fn timer_running(&self) -> bool {
        self.call
            .as_ref()
            .and_then(|call| call.timer.as_ref())
            .is_some_and(ElapsedTimer::is_running)
    }

    /// Generation of the live connection, if any
    pub fn live_generation(&self) -> Option<u64> {
        self.call.as_ref().map(|call| call.voice.generation())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            business_name: self.config.as_ref().map(|c| c.business_name.clone()),
            elapsed_secs: self.elapsed_secs,
            elapsed_display: format_elapsed(self.elapsed_secs),
            speaking: self.speaking,
            muted: self.muted,
            error_message: self.error.as_ref().map(DemoCallError::user_message),
            remaining_calls: self.deps.limiter.remaining(),
            max_call_minutes: self.config.as_ref().map(CallConfig::max_minutes),
        }
    }

    /// Watch snapshots as they change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Apply a user action
    pub async fn dispatch(&mut self, action: UserAction) -> Result<(), ActionRejected> {
        match action {
            UserAction::StartDemo => self.start_demo().await,
            UserAction::Confirm => self.confirm().await,
            UserAction::Cancel => self.cancel(),
            UserAction::ToggleMute => self.toggle_mute().map(|_| ()),
            UserAction::EndCall => self.end_call(),
            UserAction::Reset => self.reset(),
        }
    }

    /// `idle` → `loading` → `pre-call`, or straight to `limit-reached`
    ///
    /// Also accepted from `limit-reached`, which re-checks the quota (it may have rolled
    /// over to a new day).
    pub async fn start_demo(&mut self) -> Result<(), ActionRejected> {
        self.require(
            UserAction::StartDemo,
            &[CallSessionState::Idle, CallSessionState::LimitReached],
        )?;

        if self.deps.limiter.is_limited() {
            info!("Daily demo limit reached, not fetching config");
            self.transition(CallSessionState::LimitReached);
            return Ok(());
        }

        self.error = None;
        self.transition(CallSessionState::Loading);

        match self.deps.config_source.fetch_config().await {
            Ok(config) => {
                info!("Demo ready for {:?}", config.business_name);
                self.config = Some(config);
                self.transition(CallSessionState::PreCall);
            }
            Err(e) => self.fail(e),
        }

        Ok(())
    }

    /// `pre-call` → `connecting`: permission, client, quota, then start
    ///
    /// Returns once the connection attempt is under way; `call-start` (or a failure) arrives
    /// later through `handle_event`.
    pub async fn confirm(&mut self) -> Result<(), ActionRejected> {
        self.require(UserAction::Confirm, &[CallSessionState::PreCall])?;
        let Some(config) = self.config.clone() else {
            return Err(self.rejected(UserAction::Confirm));
        };

        self.transition(CallSessionState::Connecting);

        if let Err(e) = check_permission(self.deps.microphone.as_ref()).await {
            self.fail(e);
            return Ok(());
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let mut voice =
            match VoiceSession::create(self.deps.voice.as_ref(), &config.api_key, generation).await
            {
                Ok(voice) => voice,
                Err(e) => {
                    self.fail(DemoCallError::ConnectionFailed(format!("{:#}", e)));
                    return Ok(());
                }
            };

        if let Err(e) = voice.subscribe(self.events_tx.clone()) {
            self.fail(DemoCallError::ConnectionFailed(format!("{:#}", e)));
            return Ok(());
        }

        // Quota is spent only once a connection is actually attempted
        self.deps.limiter.increment();

        // The attempt runs in the background; its outcome comes back as events
        let call = self.call.insert(ActiveCall { voice, timer: None });
        let started = call
            .voice
            .start(&config.assistant_id, config.max_duration_seconds);

        if let Err(e) = started {
            error!("Failed to start call: {:#}", e);
            self.fail(DemoCallError::ConnectionFailed(format!("{:#}", e)));
        } else {
            self.publish();
        }

        Ok(())
    }

    /// `pre-call` → `idle`
    pub fn cancel(&mut self) -> Result<(), ActionRejected> {
        self.require(UserAction::Cancel, &[CallSessionState::PreCall])?;
        self.config = None;
        self.transition(CallSessionState::Idle);
        Ok(())
    }

    /// Flip local mute while a connection is owned; returns the new flag
    pub fn toggle_mute(&mut self) -> Result<bool, ActionRejected> {
        let Some(call) = self.call.as_mut() else {
            return Err(ActionRejected {
                action: UserAction::ToggleMute,
                state: self.state,
            });
        };

        self.muted = !self.muted;
        call.voice.set_muted(self.muted);
        info!("Microphone {}", if self.muted { "muted" } else { "unmuted" });
        self.publish();

        Ok(self.muted)
    }

    /// `active` → `post-call`
    pub fn end_call(&mut self) -> Result<(), ActionRejected> {
        self.require(UserAction::EndCall, &[CallSessionState::Active])?;
        self.cleanup();
        self.transition(CallSessionState::PostCall);
        Ok(())
    }

    /// `post-call` / `error` / `limit-reached` → `idle` or `limit-reached`
    pub fn reset(&mut self) -> Result<(), ActionRejected> {
        self.require(
            UserAction::Reset,
            &[
                CallSessionState::PostCall,
                CallSessionState::Error,
                CallSessionState::LimitReached,
            ],
        )?;

        self.cleanup();
        self.elapsed_secs = 0;
        self.muted = false;
        self.error = None;
        self.config = None;

        let next = if self.deps.limiter.is_limited() {
            CallSessionState::LimitReached
        } else {
            CallSessionState::Idle
        };
        self.transition(next);

        Ok(())
    }

    /// Apply a queued voice event or timer tick
    ///
    /// Anything tagged with a generation other than the live connection's is stale and
    /// ignored.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Tick { generation } => self.on_tick(generation),
            SessionEvent::Voice { generation, event } => {
                if self.live_generation() != Some(generation) {
                    debug!(
                        "Dropping {:?} from superseded call (generation={})",
                        event, generation
                    );
                    return;
                }
                self.on_voice_event(event);
            }
            SessionEvent::StartFailed {
                generation,
                message,
            } => {
                if self.live_generation() != Some(generation) {
                    debug!(
                        "Dropping start failure from superseded call (generation={})",
                        generation
                    );
                    return;
                }
                self.fail(DemoCallError::ConnectionFailed(message));
            }
        }
    }

    /// Stop the timer, then the connection
    ///
    /// Idempotent; callable from any state and on teardown.
    pub fn cleanup(&mut self) {
        if let Some(mut call) = self.call.take() {
            if let Some(mut timer) = call.timer.take() {
                timer.stop();
            }
            call.voice.stop();
            info!("Cleaned up call {}", call.voice.call_id());
        }
        self.speaking = SpeakingState::Idle;
        self.publish();
    }

    fn on_tick(&mut self, generation: u64) {
        let live = self
            .call
            .as_ref()
            .and_then(|call| call.timer.as_ref())
            .is_some_and(|timer| timer.generation() == generation && timer.is_running());

        if !live || self.state != CallSessionState::Active {
            debug!("Dropping stale tick (generation={})", generation);
            return;
        }

        self.elapsed_secs += 1;
        self.publish();
    }

    fn on_voice_event(&mut self, event: VoiceEvent) {
        match (event, self.state) {
            (VoiceEvent::CallStart, CallSessionState::Connecting) => self.enter_active(),
            (VoiceEvent::CallEnd, CallSessionState::Active) => {
                info!("Call ended");
                self.cleanup();
                self.transition(CallSessionState::PostCall);
            }
            (VoiceEvent::CallEnd, CallSessionState::Connecting) => {
                self.fail(DemoCallError::ConnectionFailed(
                    "call ended before it connected".to_string(),
                ));
            }
            (VoiceEvent::SpeechStart, CallSessionState::Active) => {
                self.speaking = SpeakingState::Speaking;
                self.publish();
            }
            (VoiceEvent::SpeechEnd, CallSessionState::Active) => {
                self.speaking = SpeakingState::Listening;
                self.publish();
            }
            (VoiceEvent::Error(message), CallSessionState::Connecting | CallSessionState::Active) => {
                error!("Voice error: {}", message);
                self.fail(DemoCallError::RuntimeVoiceError(message));
            }
            (event, state) => debug!("Ignoring {:?} while {}", event, state),
        }
    }

    fn enter_active(&mut self) {
        let Some(call) = self.call.as_mut() else {
            return;
        };

        if let Some(mut previous) = call.timer.take() {
            previous.stop();
        }

        let generation = call.voice.generation();
        self.elapsed_secs = 0;
        self.speaking = SpeakingState::Listening;
        call.timer = Some(ElapsedTimer::start(generation, self.events_tx.clone()));

        self.transition(CallSessionState::Active);
    }

    fn fail(&mut self, error: DemoCallError) {
        warn!("Demo call failed: {}", error);
        self.cleanup();
        self.config = None;
        self.error = Some(error);
        self.transition(CallSessionState::Error);
    }

    fn require(
        &self,
        action: UserAction,
        allowed: &[CallSessionState],
    ) -> Result<(), ActionRejected> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.rejected(action))
        }
    }

    fn rejected(&self, action: UserAction) -> ActionRejected {
        debug!("Rejected {} while {}", action, self.state);
        ActionRejected {
            action,
            state: self.state,
        }
    }

    fn transition(&mut self, next: CallSessionState) {
        if self.state != next {
            info!("Demo call state: {} -> {}", self.state, next);
        }
        self.state = next;
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cleanup();
    }
}
