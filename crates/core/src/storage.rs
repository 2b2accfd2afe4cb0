//! Local filesystem storage for uploaded videos.
//!
//! Stores bytes durably under `{base_dir}/videos/{millis}_{name}` and hands
//! back a retrievable locator `{public_base_url}/videos/{millis}_{name}`.
//! Stored files are never rewritten.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Sub-directory (and URL segment) holding uploaded videos.
pub const VIDEO_PREFIX: &str = "videos";

/// Upper bound on the sanitized file name length.
const MAX_FILE_NAME_LEN: usize = 128;

/// Result of storing an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVideo {
    /// Public locator (URL) for the stored bytes.
    pub locator: String,
    /// Local path of the stored file.
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Video storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalVideoStorage {
    base_dir: PathBuf,
    public_base_url: String,
}

impl LocalVideoStorage {
    pub fn new(base_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Write `bytes` to a new file and return its locator.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredVideo, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::Validation("Uploaded video is empty".into()));
        }

        let dir = self.base_dir.join(VIDEO_PREFIX);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to create {}: {e}", dir.display())))?;

        let file_name = format!(
            "{}_{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_file_name(original_name)
        );
        let path = dir.join(&file_name);

        // `create_new` keeps stored assets immutable even if two uploads
        // collide on the same millisecond and name.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| CoreError::Conflict(format!("Failed to create {}: {e}", path.display())))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, bytes)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to write {}: {e}", path.display())))?;
        tokio::io::AsyncWriteExt::flush(&mut file)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to flush {}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), size = bytes.len(), "Stored uploaded video");

        Ok(StoredVideo {
            locator: format!("{}/{VIDEO_PREFIX}/{file_name}", self.public_base_url),
            path,
            size_bytes: bytes.len() as u64,
        })
    }

    /// Delete a stored video that no job will ever read.
    pub async fn discard(&self, stored: &StoredVideo) {
        match tokio::fs::remove_file(&stored.path).await {
            Ok(()) => tracing::info!(path = %stored.path.display(), "Discarded stored video"),
            Err(e) => tracing::warn!(
                path = %stored.path.display(),
                error = %e,
                "Failed to discard stored video",
            ),
        }
    }
}

/// Reduce an uploaded file name to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload.mp4".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\rides\\cam 1.mov"), "cam_1.mov");
        assert_eq!(sanitize_file_name("..."), "upload.mp4");
        assert_eq!(sanitize_file_name(""), "upload.mp4");
    }

    #[tokio::test]
    async fn store_writes_bytes_and_returns_locator() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalVideoStorage::new(dir.path(), "http://localhost:3000/files/");

        let stored = storage.store("ride.mp4", b"fake video").await.unwrap();

        assert!(stored
            .locator
            .starts_with("http://localhost:3000/files/videos/"));
        assert!(stored.locator.ends_with("_ride.mp4"));
        assert_eq!(stored.size_bytes, 10);
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"fake video");
        assert!(stored.path.starts_with(dir.path().join(VIDEO_PREFIX)));
    }

    #[tokio::test]
    async fn store_rejects_empty_upload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalVideoStorage::new(dir.path(), "http://localhost/files");
        assert_matches!(
            storage.store("ride.mp4", b"").await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn discard_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalVideoStorage::new(dir.path(), "http://localhost:3000/files");

        let stored = storage.store("ride.mp4", b"fake video").await.unwrap();
        storage.discard(&stored).await;
        assert!(!stored.path.exists());

        // A second discard only logs.
        storage.discard(&stored).await;
    }
}
