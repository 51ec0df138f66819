//! Storage error types and retry classification.

use filedrop_protocol::AttemptOutcome;

/// Errors produced by storage adapters.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("not authenticated")]
    Unauthenticated,

    #[error("storage service returned {status}: {message}")]
    Service { status: u16, message: String },
}

impl StorageError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::InvalidInput
                    | std::io::ErrorKind::InvalidData
                    | std::io::ErrorKind::AlreadyExists
                    | std::io::ErrorKind::Unsupported
            ),
            Self::Http(e) => {
                if let Some(status) = e.status() {
                    is_transient_status(status.as_u16())
                } else {
                    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
                }
            }
            Self::Service { status, .. } => is_transient_status(*status),
            Self::Json(_) | Self::InvalidPath(_) | Self::AlreadyExists(_) | Self::Unauthenticated => {
                false
            }
        }
    }
}

/// 408, 429 and every 5xx are worth another try.
pub(crate) fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

impl From<StorageError> for AttemptOutcome {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        if err.is_transient() {
            AttemptOutcome::TransientFailure { message }
        } else {
            AttemptOutcome::FatalFailure { message }
        }
    }
}

/// Maps an adapter result (access URL or error) onto an attempt outcome.
pub fn into_outcome(result: Result<String, StorageError>) -> AttemptOutcome {
    match result {
        Ok(access_url) => AttemptOutcome::Success { access_url },
        Err(e) => e.into(),
    }
}
