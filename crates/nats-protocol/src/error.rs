use thiserror::Error;

/// Wire-level parse failures.
///
/// `Malformed` carries at most the first 100 bytes of the offending line so
/// error messages stay bounded even when a peer sends garbage.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {}", String::from_utf8_lossy(.0))]
    Malformed(Vec<u8>),
    #[error("unexpected frame in current state: {0}")]
    UnexpectedFrame(String),
    #[error("invalid INFO json: {0}")]
    InvalidInfo(String),
}

impl ProtocolError {
    pub fn malformed(bytes: &[u8]) -> Self {
        let cap = bytes.len().min(100);
        ProtocolError::Malformed(bytes[..cap].to_vec())
    }
}
