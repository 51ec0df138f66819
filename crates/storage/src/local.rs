//! Object store backed by a local directory.
//!
//! Each owner folder is a directory under `root`; objects are plain files.
//! Names starting with `.filedrop-` are reserved for the adapter's own
//! bookkeeping inside owner folders:
//!
//! - `.filedrop-<pid>-<seq>.part`: in-flight writes, renamed or linked into
//!   place once complete, so listings never show half-written uploads
//! - `.filedrop-meta/<name>`: the content type an object was uploaded with

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use filedrop_protocol::constants::PATH_SEPARATOR;
use filedrop_protocol::{AttemptOutcome, StoredFile};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::content_type::content_type_or_default;
use crate::encoding::encode_object_path;
use crate::error::{StorageError, into_outcome};
use crate::traits::{BoxFuture, ByteProgress, PutOptions, StorageCapability};
use crate::validation::{validate_object_path, validate_owner_folder};

/// Size of each write when copying a payload to disk.
const WRITE_CHUNK_SIZE: usize = 64 * 1024;

/// Prefix of every entry the adapter creates for itself.
const RESERVED_PREFIX: &str = ".filedrop-";

/// Directory (inside an owner folder) holding per-object metadata.
const META_DIR: &str = ".filedrop-meta";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    content_type: String,
}

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
    options: PutOptions,
}

/// Unique name for an in-flight write.
fn temp_name() -> String {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{RESERVED_PREFIX}{}-{seq}.part", std::process::id())
}

impl LocalStorage {
    /// Creates a store under `root`. Public URLs are `public_base_url/<path>`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            options: PutOptions::default(),
        }
    }

    /// Replaces the write policy.
    pub fn with_options(mut self, options: PutOptions) -> Self {
        self.options = options;
        self
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_object(
        &self,
        path: &str,
        payload: Bytes,
        content_type: &str,
        progress: Option<ByteProgress<'_>>,
    ) -> Result<String, StorageError> {
        validate_object_path(path)?;
        let Some((owner, name)) = path.split_once(PATH_SEPARATOR) else {
            return Err(StorageError::InvalidPath(path.to_string()));
        };
        if name.starts_with(RESERVED_PREFIX) {
            return Err(StorageError::InvalidPath(format!("reserved name: {path}")));
        }

        let dir = self.root.join(owner);
        let target = dir.join(name);
        tokio::fs::create_dir_all(&dir).await?;

        // Early out; the link below is what actually decides.
        if !self.options.upsert && tokio::fs::try_exists(&target).await? {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }

        let part = dir.join(temp_name());
        let total = payload.len() as u64;

        let written = async {
            let mut file = tokio::fs::File::create(&part).await?;
            let mut sent: u64 = 0;
            for chunk in payload.chunks(WRITE_CHUNK_SIZE) {
                file.write_all(chunk).await?;
                sent += chunk.len() as u64;
                if let Some(progress) = progress {
                    progress(sent, total);
                }
            }
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }

        if self.options.upsert {
            if let Err(e) = tokio::fs::rename(&part, &target).await {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e.into());
            }
        } else {
            // hard_link refuses to replace an existing file.
            let linked = tokio::fs::hard_link(&part, &target).await;
            let _ = tokio::fs::remove_file(&part).await;
            match linked {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    return Err(StorageError::AlreadyExists(path.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Err(e) = self.write_meta(&dir, name, content_type).await {
            warn!(path, error = %e, "failed to record content type");
        }

        debug!(path, bytes = total, root = %self.root.display(), "stored object on disk");
        Ok(self.public_url(path))
    }

    async fn write_meta(&self, dir: &Path, name: &str, content_type: &str) -> Result<(), StorageError> {
        let meta_dir = dir.join(META_DIR);
        tokio::fs::create_dir_all(&meta_dir).await?;

        let json = serde_json::to_vec(&ObjectMeta {
            content_type: content_type.to_string(),
        })?;
        let part = meta_dir.join(temp_name());
        tokio::fs::write(&part, json).await?;
        if let Err(e) = tokio::fs::rename(&part, meta_dir.join(name)).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_meta(dir: &Path, name: &str) -> Option<ObjectMeta> {
        let raw = tokio::fs::read(dir.join(META_DIR).join(name)).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }

    async fn read_folder(&self, owner_folder: &str) -> Result<Vec<StoredFile>, StorageError> {
        validate_owner_folder(owner_folder)?;

        let dir = self.root.join(owner_folder);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(RESERVED_PREFIX) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let created_at = metadata
                .created()
                .or_else(|_| metadata.modified())
                .ok()
                .map(DateTime::<Utc>::from);
            let mime_type = match Self::read_meta(&dir, &name).await {
                Some(meta) => meta.content_type,
                None => content_type_or_default(&name).to_string(),
            };
            files.push(StoredFile {
                mime_type,
                size: metadata.len(),
                created_at,
                name,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

impl StorageCapability for LocalStorage {
    fn put<'a>(
        &'a self,
        path: &'a str,
        payload: Bytes,
        content_type: &'a str,
        progress: Option<ByteProgress<'a>>,
    ) -> BoxFuture<'a, AttemptOutcome> {
        Box::pin(async move {
            into_outcome(self.write_object(path, payload, content_type, progress).await)
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, encode_object_path(path))
    }

    fn list<'a>(
        &'a self,
        owner_folder: &'a str,
    ) -> BoxFuture<'a, Result<Vec<StoredFile>, StorageError>> {
        Box::pin(self.read_folder(owner_folder))
    }

    fn backend_name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn store(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "http://localhost:8080/files/")
    }

    #[tokio::test]
    async fn put_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());

        let outcome = storage
            .put("u1/a.png", Bytes::from_static(b"PNG"), "image/png", None)
            .await;

        assert_eq!(
            outcome,
            AttemptOutcome::Success {
                access_url: "http://localhost:8080/files/u1/a.png".into()
            }
        );
        assert_eq!(std::fs::read(dir.path().join("u1/a.png")).unwrap(), b"PNG");
        assert_eq!(leftover_parts(&dir.path().join("u1")), 0);
    }

    fn leftover_parts(dir: &Path) -> usize {
        let count = |d: &Path| {
            std::fs::read_dir(d)
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
                        .count()
                })
                .unwrap_or(0)
        };
        count(dir) + count(&dir.join(META_DIR))
    }

    #[tokio::test]
    async fn list_skips_bookkeeping_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());
        std::fs::create_dir_all(dir.path().join("u1/nested")).unwrap();
        std::fs::write(dir.path().join("u1/b.txt"), b"bb").unwrap();
        std::fs::write(dir.path().join("u1/a.pdf"), b"a").unwrap();
        std::fs::write(dir.path().join("u1/.filedrop-1-7.part"), b"partial").unwrap();

        let files = storage.list("u1").await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.txt"]);
        // No recorded type: guessed from the extension.
        assert_eq!(files[0].mime_type, "application/pdf");
        assert_eq!(files[1].size, 2);
        assert!(files[1].created_at.is_some());
    }

    #[tokio::test]
    async fn dot_files_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());

        let outcome = storage
            .put("u1/.env", Bytes::from_static(b"KEY=1"), "text/plain", None)
            .await;
        assert_eq!(
            outcome,
            AttemptOutcome::Success {
                access_url: "http://localhost:8080/files/u1/.env".into()
            }
        );

        let files = storage.list("u1").await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![".env"]);
    }

    #[tokio::test]
    async fn uploaded_content_type_survives_listing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());

        storage
            .put("u1/photo", Bytes::from_static(b"PNG"), "image/png", None)
            .await;
        storage
            .put("u1/notes.txt", Bytes::from_static(b"{}"), "application/json", None)
            .await;

        let files = storage.list("u1").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "notes.txt");
        assert_eq!(files[0].mime_type, "application/json");
        assert_eq!(files[1].name, "photo");
        assert_eq!(files[1].mime_type, "image/png");
    }

    #[tokio::test]
    async fn reserved_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());
        let outcome = storage
            .put("u1/.filedrop-meta", Bytes::from_static(b"x"), "text/plain", None)
            .await;
        assert!(matches!(outcome, AttemptOutcome::FatalFailure { .. }));
    }

    #[tokio::test]
    async fn concurrent_same_name_without_upsert_has_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());

        let (first, second) = tokio::join!(
            storage.put("u1/a.txt", Bytes::from_static(b"one"), "text/plain", None),
            storage.put("u1/a.txt", Bytes::from_static(b"two"), "text/plain", None),
        );

        let successes = [&first, &second].iter().filter(|o| o.is_success()).count();
        assert_eq!(successes, 1, "{first:?} / {second:?}");
        let stored = std::fs::read(dir.path().join("u1/a.txt")).unwrap();
        assert!(stored == b"one" || stored == b"two");
        assert_eq!(leftover_parts(&dir.path().join("u1")), 0);
    }

    #[test]
    fn public_url_encodes_names() {
        let storage = LocalStorage::new("/srv/files", "http://localhost:8080/files");
        let url = reqwest::Url::parse(&storage.public_url("u1/report #1?.pdf")).unwrap();
        assert_eq!(url.path(), "/files/u1/report%20%231%3F.pdf");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[tokio::test]
    async fn list_missing_owner_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());
        assert!(storage.list("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reupload_respects_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let strict = store(dir.path());
        strict.put("u1/a.txt", Bytes::from_static(b"one"), "text/plain", None).await;

        let outcome = strict
            .put("u1/a.txt", Bytes::from_static(b"two"), "text/plain", None)
            .await;
        assert!(matches!(outcome, AttemptOutcome::FatalFailure { .. }));
        assert_eq!(std::fs::read(dir.path().join("u1/a.txt")).unwrap(), b"one");

        let lenient = store(dir.path()).with_options(PutOptions {
            upsert: true,
            ..PutOptions::default()
        });
        let outcome = lenient
            .put("u1/a.txt", Bytes::from_static(b"two"), "text/plain", None)
            .await;
        assert!(outcome.is_success());
        assert_eq!(std::fs::read(dir.path().join("u1/a.txt")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn progress_is_reported_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());
        let payload = Bytes::from(vec![7u8; WRITE_CHUNK_SIZE * 2 + 10]);
        let total = payload.len() as u64;

        let seen = Mutex::new(Vec::new());
        let progress = |sent: u64, t: u64| seen.lock().unwrap().push((sent, t));
        let outcome = storage
            .put("u1/big.bin", payload, "application/octet-stream", Some(&progress))
            .await;
        assert!(outcome.is_success());

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(seen.last().copied(), Some((total, total)));
    }

    #[tokio::test]
    async fn traversal_is_rejected_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store(dir.path());
        let outcome = storage
            .put("../escape.txt", Bytes::from_static(b"x"), "text/plain", None)
            .await;
        assert!(matches!(outcome, AttemptOutcome::FatalFailure { .. }));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
