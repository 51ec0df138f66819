//! Upload and listing flow for the signed-in user.

use std::cmp::Reverse;
use std::sync::Arc;

use filedrop_protocol::{ListedFile, RetryPolicy, SessionIdentity, UploadResult};
use filedrop_session::AuthProvider;
use filedrop_storage::StorageCapability;
use filedrop_upload::{ProgressObserver, UploadController};
use tracing::{debug, info, warn};

use crate::error::DashboardError;
use crate::types::{SelectedFile, UploadReport};

/// Ties the session, the storage backend and the retry policy together.
///
/// Holds no per-upload state, so independent uploads can run
/// concurrently through the same dashboard.
#[derive(Clone)]
pub struct Dashboard {
    auth: Arc<dyn AuthProvider>,
    storage: Arc<dyn StorageCapability>,
    policy: RetryPolicy,
}

impl Dashboard {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn StorageCapability>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            auth,
            storage,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Uploads `file` into the signed-in user's folder.
    ///
    /// On success the listing is refreshed and returned with the result.
    /// Without a session nothing is sent and the caller should send the
    /// user to sign in.
    pub async fn upload(
        &self,
        file: SelectedFile,
        observer: &dyn ProgressObserver,
    ) -> Result<UploadReport, DashboardError> {
        let session = match self.require_session() {
            Ok(session) => session,
            Err(e) => {
                observer.on_status(&e.to_string(), true);
                return Err(e);
            }
        };

        debug!(
            owner = %session.owner_id,
            file = %file.name,
            bytes = file.size(),
            "starting upload"
        );
        let request = file.into_request(&session.owner_id);

        let controller = UploadController::new(self.storage.as_ref(), self.policy);
        let result = controller.attempt_upload(&request, observer).await?;

        let listing = match &result {
            UploadResult::Success { .. } => match self.list_owner_files(&session).await {
                Ok(files) => Some(files),
                Err(e) => {
                    warn!(owner = %session.owner_id, error = %e, "failed to refresh listing");
                    None
                }
            },
            UploadResult::ExhaustedRetries { .. } => None,
        };

        Ok(UploadReport { result, listing })
    }

    /// Lists the signed-in user's files with their shareable links,
    /// newest first.
    pub async fn list_files(&self) -> Result<Vec<ListedFile>, DashboardError> {
        let session = self.require_session()?;
        self.list_owner_files(&session).await
    }

    fn require_session(&self) -> Result<SessionIdentity, DashboardError> {
        self.auth.current().ok_or(DashboardError::NotAuthenticated)
    }

    async fn list_owner_files(
        &self,
        session: &SessionIdentity,
    ) -> Result<Vec<ListedFile>, DashboardError> {
        let files = self.storage.list(&session.owner_id).await?;

        let mut listed: Vec<ListedFile> = files
            .into_iter()
            .map(|file| {
                let path = filedrop_protocol::owner_object_path(&session.owner_id, &file.name);
                ListedFile {
                    public_url: self.storage.public_url(&path),
                    file,
                }
            })
            .collect();
        listed.sort_by(|a, b| {
            Reverse(a.file.created_at)
                .cmp(&Reverse(b.file.created_at))
                .then_with(|| a.file.name.cmp(&b.file.name))
        });

        info!(owner = %session.owner_id, files = listed.len(), "listed files");
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use filedrop_protocol::{AttemptOutcome, StoredFile};
    use filedrop_session::SessionStore;
    use filedrop_storage::{BoxFuture, ByteProgress, MemoryStorage, StorageError};
    use filedrop_upload::NoopObserver;

    /// Storage that always fails transiently and counts calls.
    #[derive(Default)]
    struct DownStorage {
        puts: AtomicUsize,
        lists: AtomicUsize,
    }

    impl StorageCapability for DownStorage {
        fn put<'a>(
            &'a self,
            _path: &'a str,
            _payload: Bytes,
            _content_type: &'a str,
            _progress: Option<ByteProgress<'a>>,
        ) -> BoxFuture<'a, AttemptOutcome> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                AttemptOutcome::TransientFailure {
                    message: "service unavailable".into(),
                }
            })
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://down/{path}")
        }

        fn list<'a>(
            &'a self,
            _owner_folder: &'a str,
        ) -> BoxFuture<'a, Result<Vec<StoredFile>, StorageError>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(Vec::new()) })
        }

        fn backend_name(&self) -> &str {
            "down"
        }
    }

    /// Storage with a fixed listing, for ordering checks.
    struct FixedListing(Vec<StoredFile>);

    impl StorageCapability for FixedListing {
        fn put<'a>(
            &'a self,
            _path: &'a str,
            _payload: Bytes,
            _content_type: &'a str,
            _progress: Option<ByteProgress<'a>>,
        ) -> BoxFuture<'a, AttemptOutcome> {
            Box::pin(async {
                AttemptOutcome::FatalFailure {
                    message: "read-only".into(),
                }
            })
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://fixed/{path}")
        }

        fn list<'a>(
            &'a self,
            _owner_folder: &'a str,
        ) -> BoxFuture<'a, Result<Vec<StoredFile>, StorageError>> {
            let files = self.0.clone();
            Box::pin(async move { Ok(files) })
        }

        fn backend_name(&self) -> &str {
            "fixed"
        }
    }

    #[derive(Default)]
    struct Statuses(Mutex<Vec<(String, bool)>>);

    impl ProgressObserver for Statuses {
        fn on_progress(&self, _percent: u8) {}

        fn on_status(&self, message: &str, is_error: bool) {
            self.0.lock().unwrap().push((message.to_string(), is_error));
        }
    }

    fn signed_in() -> Arc<SessionStore> {
        Arc::new(SessionStore::signed_in(SessionIdentity::new("u1", "alice@example.com")).unwrap())
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(2000))
    }

    #[tokio::test(start_paused = true)]
    async fn upload_success_refreshes_listing() {
        let storage = Arc::new(MemoryStorage::new("https://store"));
        let dashboard = Dashboard::new(signed_in(), storage.clone(), policy());

        let report = dashboard
            .upload(SelectedFile::new("a.png", b"PNG".to_vec()), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(
            report.result,
            UploadResult::Success {
                access_url: "https://store/u1/a.png".into()
            }
        );
        let listing = report.listing.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].file.name, "a.png");
        assert_eq!(listing[0].public_url, "https://store/u1/a.png");
        assert_eq!(storage.get("u1/a.png").unwrap(), Bytes::from_static(b"PNG"));
    }

    #[tokio::test]
    async fn upload_without_session_never_touches_storage() {
        let storage = Arc::new(DownStorage::default());
        let auth = Arc::new(SessionStore::new());
        let dashboard = Dashboard::new(auth, storage.clone(), policy());
        let observer = Statuses::default();

        let result = dashboard
            .upload(SelectedFile::new("a.png", b"PNG".to_vec()), &observer)
            .await;

        assert!(matches!(result, Err(DashboardError::NotAuthenticated)));
        assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
        assert_eq!(
            observer.0.lock().unwrap().last(),
            Some(&("not signed in".to_string(), true))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_upload_skips_listing_refresh() {
        let storage = Arc::new(DownStorage::default());
        let dashboard = Dashboard::new(signed_in(), storage.clone(), policy());

        let report = dashboard
            .upload(SelectedFile::new("a.png", b"PNG".to_vec()), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(
            report.result,
            UploadResult::ExhaustedRetries {
                last_message: "service unavailable".into(),
                attempts_made: 3
            }
        );
        assert!(report.listing.is_none());
        assert_eq!(storage.puts.load(Ordering::SeqCst), 3);
        assert_eq!(storage.lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn session_is_read_per_upload() {
        let storage = Arc::new(MemoryStorage::new("https://store"));
        let auth = signed_in();
        let dashboard = Dashboard::new(auth.clone(), storage.clone(), policy());

        dashboard
            .upload(SelectedFile::new("a.txt", b"a".to_vec()), &NoopObserver)
            .await
            .unwrap();

        auth.sign_in(SessionIdentity::new("u2", "bob@example.com"))
            .unwrap();
        dashboard
            .upload(SelectedFile::new("b.txt", b"b".to_vec()), &NoopObserver)
            .await
            .unwrap();

        assert!(storage.get("u1/a.txt").is_some());
        assert!(storage.get("u2/b.txt").is_some());
        let names: Vec<String> = dashboard
            .list_files()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.file.name)
            .collect();
        assert_eq!(names, vec!["b.txt"]);

        auth.sign_out();
        assert!(matches!(
            dashboard.list_files().await,
            Err(DashboardError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let at = |h| Some(Utc.with_ymd_and_hms(2025, 9, 1, h, 0, 0).unwrap());
        let file = |name: &str, created_at| StoredFile {
            name: name.into(),
            size: 1,
            mime_type: "text/plain".into(),
            created_at,
        };
        let storage = Arc::new(FixedListing(vec![
            file("old.txt", at(8)),
            file("new.txt", at(12)),
            file("undated.txt", None),
            file("mid.txt", at(10)),
        ]));
        let dashboard = Dashboard::new(signed_in(), storage, policy());

        let listing = dashboard.list_files().await.unwrap();
        let names: Vec<&str> = listing.iter().map(|f| f.file.name.as_str()).collect();
        assert_eq!(names, vec!["new.txt", "mid.txt", "old.txt", "undated.txt"]);
        assert_eq!(listing[0].public_url, "https://fixed/u1/new.txt");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_uploads_share_one_dashboard() {
        let storage = Arc::new(MemoryStorage::new("https://store"));
        let dashboard = Dashboard::new(signed_in(), storage.clone(), policy());

        let first = {
            let dashboard = dashboard.clone();
            tokio::spawn(async move {
                dashboard
                    .upload(SelectedFile::new("one.txt", b"1".to_vec()), &NoopObserver)
                    .await
            })
        };
        let second = {
            let dashboard = dashboard.clone();
            tokio::spawn(async move {
                dashboard
                    .upload(SelectedFile::new("two.txt", b"2".to_vec()), &NoopObserver)
                    .await
            })
        };

        assert!(first.await.unwrap().unwrap().result.is_success());
        assert!(second.await.unwrap().unwrap().result.is_success());
        assert_eq!(dashboard.list_files().await.unwrap().len(), 2);
    }
}
