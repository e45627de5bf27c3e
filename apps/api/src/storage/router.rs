use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use crate::config::Config;

use super::{GcsProvider, LocalDiskProvider, S3Provider, StorageError, StorageObject, StorageProvider};

/// Upper bound on any single storage call. An operation that exceeds it is
/// reported as a timeout error rather than left hanging.
const STORAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Selects exactly one provider at construction time and forwards the
/// uniform upload/delete/sign contract to it.
///
/// Priority is fixed and evaluated once per process: GCS when its project
/// and bucket are configured, then S3 when its credentials and bucket are
/// configured, then the local filesystem. Presence of configuration is the
/// selector; there is no backend flag.
pub struct StorageRouter {
    provider: Box<dyn StorageProvider>,
}

impl StorageRouter {
    pub async fn from_config(config: &Config) -> Self {
        let provider: Box<dyn StorageProvider> = if let Some(gcs) = &config.gcs {
            Box::new(GcsProvider::from_config(gcs))
        } else if let Some(s3) = &config.s3 {
            Box::new(S3Provider::from_config(s3).await)
        } else {
            Box::new(LocalDiskProvider::new(
                config.upload_dir.clone(),
                config.public_base_url.clone(),
            ))
        };
        info!("Storage provider selected: {}", provider.name());
        Self { provider }
    }

    /// Identity of the selected provider, for observability.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn upload(
        &self,
        bytes: Bytes,
        content_type: &str,
        original_filename: &str,
        folder: &str,
    ) -> Result<StorageObject, StorageError> {
        tokio::time::timeout(
            STORAGE_TIMEOUT,
            self.provider
                .upload(bytes, content_type, original_filename, folder),
        )
        .await
        .map_err(|_| StorageError::Timeout("upload"))?
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        tokio::time::timeout(STORAGE_TIMEOUT, self.provider.delete(key))
            .await
            .map_err(|_| StorageError::Timeout("delete"))?
    }

    pub async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        tokio::time::timeout(STORAGE_TIMEOUT, self.provider.signed_url(key, ttl))
            .await
            .map_err(|_| StorageError::Timeout("signed_url"))?
    }
}
