use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::info;

use crate::config::GcsConfig;

use super::{object_key, StorageError, StorageObject, StorageProvider};

/// Remote object store "A": Google Cloud Storage over its JSON API.
///
/// Uses plain HTTP rather than a vendor SDK; the endpoint is overridable so
/// local emulators (fake-gcs-server) work in development. Signed URLs need
/// service-account key signing, which this provider does not carry, so the
/// capability is reported as unsupported.
pub struct GcsProvider {
    http: Client,
    bucket: String,
    access_token: Option<String>,
    endpoint: String,
}

impl GcsProvider {
    pub fn from_config(config: &GcsConfig) -> Self {
        info!(
            "GCS storage provider initialized (project: {}, bucket: {})",
            config.project_id, config.bucket
        );
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            bucket: config.bucket.clone(),
            access_token: config.access_token.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Escapes a generated object key for use as a single URL path segment.
/// Generated keys contain only hex, dashes, dots and the folder separator,
/// so the separator is the only character that needs escaping.
fn encode_object_name(key: &str) -> String {
    key.replace('/', "%2F")
}

#[async_trait]
impl StorageProvider for GcsProvider {
    fn name(&self) -> &'static str {
        "gcs"
    }

    async fn upload(
        &self,
        bytes: Bytes,
        content_type: &str,
        original_filename: &str,
        folder: &str,
    ) -> Result<StorageObject, StorageError> {
        let key = object_key(folder, original_filename);
        let upload_url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.endpoint,
            self.bucket,
            encode_object_name(&key)
        );

        let response = self
            .authorize(self.http.post(upload_url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload(format!(
                "GCS returned {status}: {body}"
            )));
        }

        Ok(StorageObject {
            url: self.object_url(&key),
            key,
            provider: self.name().to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let delete_url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.endpoint,
            self.bucket,
            encode_object_name(key)
        );

        let response = self
            .authorize(self.http.delete(delete_url))
            .send()
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))?;

        let status = response.status();
        // An already-absent object is a successful delete.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Delete(format!("GCS returned {status}: {body}")))
    }

    async fn signed_url(&self, _key: &str, _ttl: Duration) -> Result<String, StorageError> {
        Err(StorageError::SigningUnsupported(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GcsConfig {
        GcsConfig {
            project_id: "demo-project".to_string(),
            bucket: "artifacts".to_string(),
            access_token: None,
            endpoint: "https://storage.googleapis.com".to_string(),
        }
    }

    #[test]
    fn test_encode_object_name_escapes_separator() {
        assert_eq!(
            encode_object_name("resumes/abc.pdf"),
            "resumes%2Fabc.pdf"
        );
    }

    #[test]
    fn test_object_url_shape() {
        let provider = GcsProvider::from_config(&test_config());
        assert_eq!(
            provider.object_url("resumes/abc.pdf"),
            "https://storage.googleapis.com/artifacts/resumes/abc.pdf"
        );
    }

    #[tokio::test]
    async fn test_signed_url_is_unsupported() {
        let provider = GcsProvider::from_config(&test_config());
        let err = provider
            .signed_url("resumes/abc.pdf", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SigningUnsupported("gcs")));
    }
}
