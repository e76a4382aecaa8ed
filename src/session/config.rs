use serde::Serialize;
use std::fmt;

use crate::demo_config::DemoConfigResponse;
use crate::error::DemoCallError;

/// Call length used when the backend omits `maxDurationSeconds`
pub const DEFAULT_MAX_DURATION_SECS: u32 = 120;

/// Parameters for one demo call attempt
///
/// Fetched once per attempt and dropped when the session returns to `idle`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CallConfig {
    /// Tenant shown to the caller (e.g., "Acme Dental")
    pub business_name: String,

    /// Hosted assistant to connect to
    pub assistant_id: String,

    /// Public key for the voice provider
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Call length enforced by the provider
    pub max_duration_seconds: u32,
}

impl CallConfig {
    /// Whole minutes, for the "Max N min demo" hint
    pub fn max_minutes(&self) -> u32 {
        self.max_duration_seconds / 60
    }
}

impl fmt::Debug for CallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallConfig")
            .field("business_name", &self.business_name)
            .field("assistant_id", &self.assistant_id)
            .field("api_key", &"[REDACTED]")
            .field("max_duration_seconds", &self.max_duration_seconds)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<DemoConfigResponse> for CallConfig {
    type Error = DemoCallError;

    fn try_from(response: DemoConfigResponse) -> Result<Self, Self::Error> {
        let assistant_id =
            non_empty(response.assistant_id).ok_or(DemoCallError::ConfigIncomplete)?;
        let api_key =
            non_empty(response.vapi_public_key).ok_or(DemoCallError::ConfigIncomplete)?;

        let max_duration_seconds = match response.max_duration_seconds {
            Some(secs) if secs >= 1.0 => secs.min(u32::MAX as f64) as u32,
            _ => DEFAULT_MAX_DURATION_SECS,
        };

        Ok(Self {
            business_name: response.business_name.unwrap_or_default(),
            assistant_id,
            api_key,
            max_duration_seconds,
        })
    }
}
