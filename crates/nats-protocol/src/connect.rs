use serde::Serialize;

/// Body of the `CONNECT` control line the client emits during handshake.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectInfo {
    pub verbose: bool,
    pub pedantic: bool,
    pub name: String,
    pub lang: String,
    pub version: String,
    pub protocol: u8,
    pub echo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_required: Option<bool>,
}

impl ConnectInfo {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ConnectInfo always serializes")
    }
}
