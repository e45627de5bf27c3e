use std::time::Duration;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::config::S3Config;

use super::{object_key, StorageError, StorageObject, StorageProvider};

/// Remote object store "B": S3 (or MinIO via the endpoint override, exactly
/// like local development against a MinIO container).
pub struct S3Provider {
    client: aws_sdk_s3::Client,
    bucket: String,
    endpoint: Option<String>,
    region: String,
}

impl S3Provider {
    pub async fn from_config(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "assessment-static",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        info!("S3 storage provider initialized (bucket: {})", config.bucket);

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            endpoint: config
                .endpoint
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
            region: config.region.clone(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        match &self.endpoint {
            // MinIO and friends are path-style.
            Some(endpoint) => format!("{}/{}/{}", endpoint, self.bucket, key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn upload(
        &self,
        bytes: Bytes,
        content_type: &str,
        original_filename: &str,
        folder: &str,
    ) -> Result<StorageObject, StorageError> {
        let key = object_key(folder, original_filename);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        Ok(StorageObject {
            url: self.object_url(&key),
            key,
            provider: self.name().to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        // S3 DeleteObject succeeds for keys that do not exist, which gives
        // the idempotence this contract requires for free.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))?;
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| StorageError::Sign(format!("invalid signing TTL: {e}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Sign(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }
}
