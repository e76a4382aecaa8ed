use serde::{Deserialize, Serialize};

/// Successful body of `GET <demo config URL>`
///
/// Every field is optional on the wire; validation happens when converting to `CallConfig`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoConfigResponse {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub vapi_public_key: Option<String>,
    #[serde(default)]
    pub max_duration_seconds: Option<f64>,
}

/// Body of a non-success response, `{"error": "..."}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
