use nats_client_core::{ClientError, SerializationError};
use thiserror::Error;

/// Failure surfaced by the stream layer's administrative API.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream API call failed ({code}): {description}")]
    ApiFailure { code: i64, description: String },
    #[error("stream layer is not enabled on this server")]
    NotAvailable,
}

impl StreamError {
    /// `true` when the description looks like a "resource not found"
    /// response rather than a genuine failure -- used by bootstrap to
    /// decide whether to attempt creation.
    pub fn looks_like_not_found(&self) -> bool {
        match self {
            StreamError::ApiFailure { description, .. } => {
                description.to_lowercase().contains("not found")
            }
            StreamError::NotAvailable => false,
        }
    }

    /// `true` when the description indicates the resource already
    /// exists -- treated as success by bootstrap per the documented
    /// open question on concurrent stream creation.
    pub fn looks_like_already_exists(&self) -> bool {
        match self {
            StreamError::ApiFailure { description, .. } => {
                let lower = description.to_lowercase();
                lower.contains("already") && lower.contains("exist")
            }
            StreamError::NotAvailable => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum JetStreamError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
