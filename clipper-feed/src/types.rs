use serde::Deserialize;
use serde_json::Value;

/// Envelope of the timeline query endpoint. Only `status` and `data` are
/// interpreted; everything inside `data` stays opaque.
#[derive(Debug, Deserialize)]
pub struct QueryEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Option<Value>,
}
