use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, PATH_SEPARATOR};

/// Builds the storage path for a file: `<owner>/<file>`.
///
/// One folder per owner, flat file names beneath it.
pub fn owner_object_path(owner_id: &str, file_identifier: &str) -> String {
    format!("{owner_id}{PATH_SEPARATOR}{file_identifier}")
}

/// A single file upload, built fresh for every user-initiated upload.
///
/// The controller only ever borrows the request, so it cannot change
/// between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// File name, unique within the owner folder.
    pub file_identifier: String,
    pub payload: Bytes,
    pub size_bytes: u64,
    pub mime_type: String,
    pub owner_id: String,
}

impl UploadRequest {
    /// Creates a request whose `size_bytes` matches the payload length.
    pub fn new(
        owner_id: impl Into<String>,
        file_identifier: impl Into<String>,
        payload: impl Into<Bytes>,
        mime_type: impl Into<String>,
    ) -> Self {
        let payload = payload.into();
        Self {
            file_identifier: file_identifier.into(),
            size_bytes: payload.len() as u64,
            payload,
            mime_type: mime_type.into(),
            owner_id: owner_id.into(),
        }
    }

    /// Storage path this request is addressed to.
    pub fn object_path(&self) -> String {
        owner_object_path(&self.owner_id, &self.file_identifier)
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first one. Must be at least 1.
    pub max_attempts: u32,
    pub delay_between_attempts: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_between_attempts: Duration) -> Self {
        Self {
            max_attempts,
            delay_between_attempts,
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// Result of one `put` against a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { access_url: String },
    /// Likely to succeed if tried again (network blip, 5xx, throttling).
    TransientFailure { message: String },
    /// Retrying cannot help (no session, rejected request, conflict).
    FatalFailure { message: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Terminal value of an upload. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UploadResult {
    #[serde(rename_all = "camelCase")]
    Success { access_url: String },
    #[serde(rename_all = "camelCase")]
    ExhaustedRetries {
        last_message: String,
        attempts_made: u32,
    },
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Access URL on success.
    pub fn access_url(&self) -> Option<&str> {
        match self {
            Self::Success { access_url } => Some(access_url),
            Self::ExhaustedRetries { .. } => None,
        }
    }
}

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl SessionIdentity {
    pub fn new(owner_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            email: email.into(),
        }
    }
}

/// An object stored in an owner folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// File name relative to the owner folder.
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A stored file together with its shareable link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedFile {
    #[serde(flatten)]
    pub file: StoredFile,
    pub public_url: String,
}
