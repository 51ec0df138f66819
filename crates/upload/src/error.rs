//! Upload error types.

/// Input rejected before any storage call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("invalid retry policy: max_attempts must be at least 1")]
    InvalidPolicy,

    #[error("invalid upload request: {0}")]
    InvalidRequest(String),
}
