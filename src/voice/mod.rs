//! Real-time voice connection boundary
//!
//! The hosted provider's client is reached through `VoiceClient`; `VoiceSession` wraps one
//! client with the ownership and cleanup rules the demo-call session depends on.

pub mod adapter;
pub mod client;
pub mod loopback;

pub use adapter::VoiceSession;
pub use client::{
    LoopbackTiming, VoiceClient, VoiceClientFactory, VoiceEvent, VoiceEventSink, VoiceProvider,
};
pub use loopback::{LoopbackVoiceClient, LoopbackVoiceFactory};
