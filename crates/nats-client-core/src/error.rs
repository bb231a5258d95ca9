use nats_protocol::ProtocolError;
use thiserror::Error;

/// Failures that can occur while establishing or maintaining the
/// connection itself, independent of any particular operation.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connect timed out")]
    Timeout,
    #[error("connection refused")]
    Refused,
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("operation attempted outside the Ready state")]
    NotConnected,
    #[error("remote closed the connection")]
    Disconnected,
    #[error("connect failed: {0}")]
    Other(String),
}

/// A subject violates the token rules for its direction (publish vs.
/// subscribe).
#[derive(Debug, Error)]
#[error("invalid subject for {direction}: {subject:?}")]
pub struct SubjectError {
    pub subject: String,
    pub direction: SubjectDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectDirection {
    Publish,
    Subscribe,
}

impl std::fmt::Display for SubjectDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectDirection::Publish => write!(f, "publish"),
            SubjectDirection::Subscribe => write!(f, "subscribe"),
        }
    }
}

/// A deadline elapsed before the awaited event happened.
#[derive(Debug, Error)]
pub enum TimeoutError {
    #[error("no reply received within the deadline")]
    Request,
    #[error("read deadline elapsed with no data")]
    Read,
}

/// A payload failed to encode or decode as JSON.
#[derive(Debug, Error)]
#[error("serialization failed: {0}")]
pub struct SerializationError(pub String);

/// Umbrella error returned by every public operation on `Session`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
