use anyhow::Result;
use serde::Deserialize;

use crate::demo_config::DEFAULT_CONFIG_URL;
use crate::voice::VoiceProvider;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub demo: DemoConfig,
    pub storage: StorageConfig,
    pub microphone: MicrophoneConfig,
    pub voice: VoiceConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DemoConfig {
    /// Widget backend endpoint serving the per-tenant call config
    pub config_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted call quota
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct MicrophoneConfig {
    pub allow: bool,
}

#[derive(Debug, Deserialize)]
pub struct VoiceConfig {
    pub provider: VoiceProvider,
    pub greeting_delay_ms: u64,
    pub greeting_length_ms: u64,
}

impl Config {
    /// Load `path` (any extension the `config` crate knows) over built-in defaults, then
    /// apply `VOXLI__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "voxli-demo")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8787_i64)?
            .set_default("demo.config_url", DEFAULT_CONFIG_URL)?
            .set_default("demo.request_timeout_ms", 10_000_i64)?
            .set_default("storage.path", ".voxli")?
            .set_default("microphone.allow", true)?
            .set_default("voice.provider", "loopback")?
            .set_default("voice.greeting_delay_ms", 600_i64)?
            .set_default("voice.greeting_length_ms", 2_500_i64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOXLI").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
