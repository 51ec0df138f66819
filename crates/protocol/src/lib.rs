//! Shared data model for filedrop.
//!
//! Everything the upload controller, storage adapters and dashboard pass
//! between each other lives here so none of them depend on one another
//! just for a type.

pub mod constants;
pub mod types;

pub use types::{
    AttemptOutcome, ListedFile, RetryPolicy, SessionIdentity, StoredFile, UploadRequest,
    UploadResult, owner_object_path,
};
