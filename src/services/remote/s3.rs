use super::{RemoteObject, RemoteStorage, RemoteStorageError};
use crate::config::S3Config;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::info;

const KEY_PREFIX: &str = "summaries";

/// S3 compatible bucket (MinIO, AWS) whose objects are publicly readable
/// under `public_url`.
pub struct S3RemoteStorage {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3RemoteStorage {
    pub fn new(client: Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn from_config(config: &S3Config) -> Self {
        info!("☁️  S3 Storage: {} (Bucket: {})", config.endpoint, config.bucket);

        let aws_config = aws_config::from_env()
            .endpoint_url(&config.endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(true)
            .build();

        Self::new(
            Client::from_conf(s3_config),
            config.bucket.clone(),
            config.public_url.clone(),
        )
    }

    pub fn object_key(file_name: &str) -> String {
        format!("{}/{}", KEY_PREFIX, file_name)
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

#[async_trait]
impl RemoteStorage for S3RemoteStorage {
    fn provider_id(&self) -> &'static str {
        "s3"
    }

    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<RemoteObject, RemoteStorageError> {
        let key = Self::object_key(file_name);
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| RemoteStorageError::Other(format!("Failed to open staged file: {}", e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(mime_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                RemoteStorageError::Other(format!(
                    "S3 put_object failed: bucket={}, key={}, error={:?}",
                    self.bucket, key, e
                ))
            })?;

        Ok(RemoteObject {
            url: self.object_url(&key),
            id: key,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteStorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|e| RemoteStorageError::Other(format!("S3 delete_object failed: {:?}", e)))?;
        Ok(())
    }

    async fn verify(&self) -> Result<(), RemoteStorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| RemoteStorageError::Other(format!("S3 head_bucket failed: {:?}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_and_url() {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        let storage = S3RemoteStorage::new(
            Client::from_conf(config),
            "summaries".to_string(),
            "https://cdn.example.org/summaries/".to_string(),
        );

        let key = S3RemoteStorage::object_key("summary-1-2.pdf");
        assert_eq!(key, "summaries/summary-1-2.pdf");
        assert_eq!(
            storage.object_url(&key),
            "https://cdn.example.org/summaries/summaries/summary-1-2.pdf"
        );
    }
}
