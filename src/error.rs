use thiserror::Error;

use crate::types::ErrorKind;

/// Errors surfaced by the queue store and processor.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Item is currently processing: {0}")]
    ItemProcessing(String),

    #[error("Only errored items can be retried: {0}")]
    NotRetryable(String),

    #[error("A run is already in progress")]
    RunInProgress,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for QueueError {
    fn from(err: anyhow::Error) -> Self {
        QueueError::Other(err.to_string())
    }
}

/// Failures of the completion service boundary.
///
/// Each variant maps onto one coarse [`ErrorKind`] category carried
/// on errored items and surfaced to the UI shell.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Empty or invalid response: {0}")]
    EmptyResponse(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Auth(_) => ErrorKind::AuthenticationFailure,
            ServiceError::RateLimited(_) => ErrorKind::RateLimited,
            ServiceError::MalformedRequest(_) => ErrorKind::MalformedRequest,
            ServiceError::Network(_) => ErrorKind::TransientNetworkFailure,
            ServiceError::EmptyResponse(_) => ErrorKind::EmptyOrInvalidResponse,
        }
    }

    /// The raw (untruncated) message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::Auth(m)
            | ServiceError::RateLimited(m)
            | ServiceError::MalformedRequest(m)
            | ServiceError::Network(m)
            | ServiceError::EmptyResponse(m) => m,
        }
    }
}
