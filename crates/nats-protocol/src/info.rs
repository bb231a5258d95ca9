use serde::{Deserialize, Serialize};

/// Capability blob the server advertises once, at the start of the
/// handshake, via the `INFO` control line.
///
/// Immutable for the lifetime of the session once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_max_payload")]
    pub max_payload: i64,
    #[serde(default)]
    pub headers: bool,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub tls_required: bool,
    #[serde(default, rename = "jetstream")]
    pub stream_layer_enabled: bool,
}

fn default_max_payload() -> i64 {
    1024 * 1024
}

impl ServerInfo {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
