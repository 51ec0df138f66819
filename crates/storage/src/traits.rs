//! The storage capability every backend adapter implements.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use filedrop_protocol::constants::DEFAULT_CACHE_CONTROL;
use filedrop_protocol::{AttemptOutcome, StoredFile};

use crate::error::StorageError;

/// Boxed future returned by [`StorageCapability`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Byte-level progress callback: `(bytes_sent, bytes_total)`.
pub type ByteProgress<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// Write policy applied by an adapter to every `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    /// Overwrite an existing object with the same path. When `false`, a
    /// same-name re-upload fails with [`StorageError::AlreadyExists`].
    pub upsert: bool,
    /// `cache-control` max-age in seconds, for backends that serve objects.
    pub cache_control: String,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            upsert: false,
            cache_control: DEFAULT_CACHE_CONTROL.into(),
        }
    }
}

/// Abstract object store.
///
/// The dashboard wires one adapter in; the upload controller calls it
/// without knowing which.
pub trait StorageCapability: Send + Sync {
    /// Stores `payload` at `path` and returns the outcome of this single
    /// attempt. Adapters that can observe bytes leaving report them through
    /// `progress`.
    fn put<'a>(
        &'a self,
        path: &'a str,
        payload: Bytes,
        content_type: &'a str,
        progress: Option<ByteProgress<'a>>,
    ) -> BoxFuture<'a, AttemptOutcome>;

    /// Public (shareable) URL for an object path.
    fn public_url(&self, path: &str) -> String;

    /// Lists the files in an owner folder.
    fn list<'a>(&'a self, owner_folder: &'a str)
    -> BoxFuture<'a, Result<Vec<StoredFile>, StorageError>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &str;
}
