pub mod audio;
pub mod config;
pub mod demo_config;
pub mod error;
pub mod http;
pub mod quota;
pub mod session;
pub mod voice;
pub mod waitlist;

pub use audio::{check_permission, ConfiguredMicrophone, Microphone};
pub use config::Config;
pub use demo_config::{ConfigSource, HttpConfigFetcher};
pub use error::{ActionRejected, DemoCallError};
pub use http::{create_router, AppState};
pub use quota::{FileStore, KeyValueStore, MemoryStore, RateLimiter, MAX_DAILY_CALLS};
pub use session::{
    CallConfig, CallSessionState, SessionController, SessionDeps, SessionHandle, SessionSnapshot,
    SpeakingState, UserAction,
};
pub use voice::{VoiceClient, VoiceClientFactory, VoiceEvent, VoiceSession};
pub use waitlist::{MemoryWaitlist, WaitlistError, WaitlistStore};
