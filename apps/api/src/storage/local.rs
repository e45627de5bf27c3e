use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;

use super::{object_key, StorageError, StorageObject, StorageProvider};

/// Local-filesystem provider — the universal fallback when no remote store
/// is configured. Files land under `base_dir` and are served back over HTTP
/// from `{public_base_url}/files/{key}`.
pub struct LocalDiskProvider {
    base_dir: PathBuf,
    public_base_url: String,
}

impl LocalDiskProvider {
    pub fn new(base_dir: PathBuf, public_base_url: String) -> Self {
        Self {
            base_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }
}

#[async_trait]
impl StorageProvider for LocalDiskProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upload(
        &self,
        bytes: Bytes,
        _content_type: &str,
        original_filename: &str,
        folder: &str,
    ) -> Result<StorageObject, StorageError> {
        let key = object_key(folder, original_filename);
        let target = self.object_path(&key);
        let base_dir = self.base_dir.clone();

        // Write to a temp file in the same directory tree, then rename into
        // place. A failed upload never leaves a partial object addressable
        // under its key.
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let parent = target.parent().expect("object path has a parent");
            std::fs::create_dir_all(parent)?;
            let mut tmp = NamedTempFile::new_in(&base_dir)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Upload(format!("write task failed: {e}")))?
        .map_err(|e| StorageError::Upload(e.to_string()))?;

        let url = format!("{}/files/{}", self.public_base_url, key);
        Ok(StorageObject {
            key,
            url,
            provider: self.name().to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        // Keys are generated by this crate; anything trying to walk out of
        // the base directory is rejected rather than resolved.
        if key.contains("..") || key.starts_with('/') {
            return Err(StorageError::Delete(format!("invalid object key: {key}")));
        }
        match tokio::fs::remove_file(self.object_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete(e.to_string())),
        }
    }

    async fn signed_url(&self, _key: &str, _ttl: Duration) -> Result<String, StorageError> {
        Err(StorageError::SigningUnsupported(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn provider(dir: &tempfile::TempDir) -> LocalDiskProvider {
        LocalDiskProvider::new(
            dir.path().to_path_buf(),
            "http://localhost:8080".to_string(),
        )
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_returns_key() {
        let dir = tempfile::tempdir().unwrap();
        let p = provider(&dir);

        let obj = p
            .upload(
                Bytes::from_static(b"resume body"),
                "application/pdf",
                "resume.pdf",
                "resumes",
            )
            .await
            .unwrap();

        assert!(obj.key.starts_with("resumes/"));
        assert!(obj.key.ends_with(".pdf"));
        assert_eq!(obj.provider, "local");
        assert_eq!(obj.url, format!("http://localhost:8080/files/{}", obj.key));

        let stored = std::fs::read(dir.path().join(&obj.key)).unwrap();
        assert_eq!(stored, b"resume body");
    }

    #[tokio::test]
    async fn test_extensionless_upload_gets_bin_key() {
        let dir = tempfile::tempdir().unwrap();
        let p = provider(&dir);

        let obj = p
            .upload(
                Bytes::from_static(b"x"),
                "application/octet-stream",
                "resume",
                "resumes",
            )
            .await
            .unwrap();

        let (id, ext) = obj.key.strip_prefix("resumes/").unwrap().rsplit_once('.').unwrap();
        assert_eq!(ext, "bin");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let p = provider(&dir);

        let obj = p
            .upload(Bytes::from_static(b"x"), "text/plain", "a.txt", "resumes")
            .await
            .unwrap();

        p.delete(&obj.key).await.unwrap();
        // Second delete of the same key, and a delete of a key that never
        // existed, both succeed.
        p.delete(&obj.key).await.unwrap();
        p.delete("resumes/never-uploaded.bin").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let p = provider(&dir);
        assert!(p.delete("../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_signed_url_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let p = provider(&dir);
        let err = p
            .signed_url("resumes/x.pdf", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SigningUnsupported("local")));
    }
}
