//! Data types for the dashboard flow.

use std::path::Path;

use bytes::Bytes;
use filedrop_protocol::{ListedFile, UploadRequest, UploadResult};
use filedrop_storage::content_type_or_default;

use crate::error::DashboardError;

/// A file the user picked, read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Bytes,
    pub mime_type: String,
}

impl SelectedFile {
    /// Creates a selection with the MIME type detected from `name`.
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = content_type_or_default(&name).to_string();
        Self {
            name,
            bytes: bytes.into(),
            mime_type,
        }
    }

    /// Reads a file from disk. The upload name is the file's base name.
    pub async fn from_path(path: &Path) -> Result<Self, DashboardError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DashboardError::InvalidFile(path.display().to_string()))?
            .to_string();
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, data))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Builds the upload request for `owner_id`'s folder.
    pub fn into_request(self, owner_id: &str) -> UploadRequest {
        UploadRequest::new(owner_id, self.name, self.bytes, self.mime_type)
    }
}

/// What an upload produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub result: UploadResult,
    /// The owner's refreshed listing. Only fetched after a successful
    /// upload; `None` if the upload failed or the refresh did.
    pub listing: Option<Vec<ListedFile>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_detects_mime_type() {
        let file = SelectedFile::new("photo.JPG", vec![1, 2, 3]);
        assert_eq!(file.mime_type, "image/jpeg");
        assert_eq!(file.size(), 3);

        let unknown = SelectedFile::new("blob", Vec::new());
        assert_eq!(unknown.mime_type, "application/octet-stream");
    }

    #[test]
    fn into_request_addresses_owner_folder() {
        let req = SelectedFile::new("a.png", vec![0u8; 4]).into_request("u1");
        assert_eq!(req.object_path(), "u1/a.png");
        assert_eq!(req.size_bytes, 4);
        assert_eq!(req.mime_type, "image/png");
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.bytes, Bytes::from_static(b"hello"));
        assert_eq!(file.mime_type, "text/plain");
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let result = SelectedFile::from_path(Path::new("/definitely/not/real.txt")).await;
        assert!(matches!(result, Err(DashboardError::Io(_))));
    }
}
