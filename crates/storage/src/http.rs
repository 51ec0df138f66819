//! Adapter for a Supabase-style REST object API.
//!
//! Endpoints used:
//! - `POST {endpoint}/storage/v1/object/{bucket}/{path}`: upload
//! - `POST {endpoint}/storage/v1/object/list/{bucket}`: list a folder
//! - `{endpoint}/storage/v1/object/public/{bucket}/{path}`: public URL

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use filedrop_protocol::constants::FALLBACK_MIME_TYPE;
use filedrop_protocol::{AttemptOutcome, StoredFile};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::encoding::{encode_object_path, encode_segment};
use crate::error::{StorageError, into_outcome};
use crate::traits::{BoxFuture, ByteProgress, PutOptions, StorageCapability};
use crate::validation::{validate_object_path, validate_owner_folder};

/// Page size used when listing a folder. Pages are fetched until one
/// comes back short.
const LIST_LIMIT: u32 = 100;

/// Placeholder object some providers create to materialize empty folders.
const FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// API key that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Connection settings for [`HttpStorage`].
#[derive(Debug, Clone)]
pub struct HttpStorageConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub endpoint: String,
    pub bucket: String,
    pub api_key: ApiKey,
    /// Per-request timeout. `None` keeps reqwest's default (no timeout).
    pub timeout: Option<Duration>,
    pub options: PutOptions,
}

/// Object store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStorage {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    api_key: ApiKey,
    options: PutOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<EntryMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct EntryMetadata {
    #[serde(default)]
    size: u64,
    #[serde(default)]
    mimetype: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpStorage {
    /// Builds the adapter and its HTTP client.
    pub fn new(config: HttpStorageConfig) -> Result<Self, StorageError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket,
            api_key: config.api_key,
            options: config.options,
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.endpoint,
            encode_segment(&self.bucket),
            encode_object_path(path)
        )
    }

    fn list_url(&self) -> String {
        format!(
            "{}/storage/v1/object/list/{}",
            self.endpoint,
            encode_segment(&self.bucket)
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(self.api_key.expose())
            .header("apikey", self.api_key.expose())
    }

    async fn upload(
        &self,
        path: &str,
        payload: Bytes,
        content_type: &str,
        progress: Option<ByteProgress<'_>>,
    ) -> Result<String, StorageError> {
        validate_object_path(path)?;
        let total = payload.len() as u64;

        let request = self
            .authorized(self.client.post(self.object_url(path)))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(
                reqwest::header::CACHE_CONTROL,
                format!("max-age={}", self.options.cache_control),
            )
            .header("x-upsert", if self.options.upsert { "true" } else { "false" })
            .body(payload);

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, path));
        }

        if let Some(progress) = progress {
            progress(total, total);
        }
        debug!(path, bytes = total, bucket = %self.bucket, "uploaded object over HTTP");

        Ok(self.public_url(path))
    }

    async fn list_folder(&self, owner_folder: &str) -> Result<Vec<StoredFile>, StorageError> {
        validate_owner_folder(owner_folder)?;

        let mut files = Vec::new();
        let mut offset = 0;
        loop {
            let body = ListRequest {
                prefix: owner_folder,
                limit: LIST_LIMIT,
                offset,
                sort_by: SortBy {
                    column: "name",
                    order: "asc",
                },
            };
            let response = self
                .authorized(self.client.post(self.list_url()))
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(status_error(status, &text, owner_folder));
            }

            let entries: Vec<ListEntry> = serde_json::from_str(&text)?;
            let fetched = entries.len() as u32;
            files.extend(into_stored_files(entries));
            if fetched < LIST_LIMIT {
                break;
            }
            offset += fetched;
            debug!(owner_folder, offset, "fetching next listing page");
        }

        Ok(files)
    }
}

/// Turns a non-success response into a [`StorageError`].
fn status_error(status: StatusCode, body: &str, path: &str) -> StorageError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Unauthenticated,
        StatusCode::CONFLICT => StorageError::AlreadyExists(path.to_string()),
        _ => {
            let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
            let message = parsed
                .message
                .or(parsed.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").into());
            StorageError::Service {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn into_stored_files(entries: Vec<ListEntry>) -> Vec<StoredFile> {
    entries
        .into_iter()
        // Sub-folders come back without an id.
        .filter(|e| e.id.is_some() && e.name != FOLDER_PLACEHOLDER)
        .map(|e| {
            let metadata = e.metadata.unwrap_or_default();
            StoredFile {
                name: e.name,
                size: metadata.size,
                mime_type: metadata
                    .mimetype
                    .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string()),
                created_at: e.created_at,
            }
        })
        .collect()
}

impl StorageCapability for HttpStorage {
    fn put<'a>(
        &'a self,
        path: &'a str,
        payload: Bytes,
        content_type: &'a str,
        progress: Option<ByteProgress<'a>>,
    ) -> BoxFuture<'a, AttemptOutcome> {
        Box::pin(async move { into_outcome(self.upload(path, payload, content_type, progress).await) })
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.endpoint,
            encode_segment(&self.bucket),
            encode_object_path(path)
        )
    }

    fn list<'a>(
        &'a self,
        owner_folder: &'a str,
    ) -> BoxFuture<'a, Result<Vec<StoredFile>, StorageError>> {
        Box::pin(self.list_folder(owner_folder))
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}
