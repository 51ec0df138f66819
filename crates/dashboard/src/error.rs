//! Dashboard error types.

/// Errors produced by dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("upload error: {0}")]
    Upload(#[from] filedrop_upload::UploadError),

    #[error("storage error: {0}")]
    Storage(#[from] filedrop_storage::StorageError),
}
