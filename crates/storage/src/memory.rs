//! In-process object store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use filedrop_protocol::constants::PATH_SEPARATOR;
use filedrop_protocol::{AttemptOutcome, StoredFile};
use tracing::debug;

use crate::encoding::encode_object_path;
use crate::error::{StorageError, into_outcome};
use crate::traits::{BoxFuture, ByteProgress, PutOptions, StorageCapability};
use crate::validation::{validate_object_path, validate_owner_folder};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    created_at: DateTime<Utc>,
}

/// Object store kept in memory. Nothing survives the process.
pub struct MemoryStorage {
    base_url: String,
    options: PutOptions,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStorage {
    /// Creates an empty store whose public URLs start with `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options: PutOptions::default(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Replaces the write policy.
    pub fn with_options(mut self, options: PutOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the stored bytes for a path, if any.
    pub fn get(&self, path: &str) -> Option<Bytes> {
        let objects = self.objects.read().ok()?;
        objects.get(path).map(|o| o.data.clone())
    }

    /// Number of stored objects across all owners.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(
        &self,
        path: &str,
        payload: Bytes,
        content_type: &str,
        progress: Option<ByteProgress<'_>>,
    ) -> Result<String, StorageError> {
        validate_object_path(path)?;

        let total = payload.len() as u64;
        {
            let mut objects = self
                .objects
                .write()
                .map_err(|_| StorageError::Io(std::io::Error::other("storage lock poisoned")))?;
            if !self.options.upsert && objects.contains_key(path) {
                return Err(StorageError::AlreadyExists(path.to_string()));
            }
            objects.insert(
                path.to_string(),
                StoredObject {
                    data: payload,
                    content_type: content_type.to_string(),
                    created_at: Utc::now(),
                },
            );
        }

        if let Some(progress) = progress {
            progress(total, total);
        }
        debug!(path, bytes = total, "stored object in memory");

        Ok(self.public_url(path))
    }
}

impl StorageCapability for MemoryStorage {
    fn put<'a>(
        &'a self,
        path: &'a str,
        payload: Bytes,
        content_type: &'a str,
        progress: Option<ByteProgress<'a>>,
    ) -> BoxFuture<'a, AttemptOutcome> {
        Box::pin(async move { into_outcome(self.store(path, payload, content_type, progress)) })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, encode_object_path(path))
    }

    fn list<'a>(
        &'a self,
        owner_folder: &'a str,
    ) -> BoxFuture<'a, Result<Vec<StoredFile>, StorageError>> {
        Box::pin(async move {
            validate_owner_folder(owner_folder)?;
            let prefix = format!("{owner_folder}{PATH_SEPARATOR}");
            let objects = self
                .objects
                .read()
                .map_err(|_| StorageError::Io(std::io::Error::other("storage lock poisoned")))?;

            let files = objects
                .range(prefix.clone()..)
                .take_while(|(path, _)| path.starts_with(&prefix))
                .map(|(path, object)| StoredFile {
                    name: path[prefix.len()..].to_string(),
                    size: object.data.len() as u64,
                    mime_type: object.content_type.clone(),
                    created_at: Some(object.created_at),
                })
                .collect();
            Ok(files)
        })
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
