use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::config::StorageConfig;
use crate::error::AppError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` publicly readable and returns its public URL.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    config: StorageConfig,
}

impl S3Service {
    pub async fn new(config: StorageConfig) -> Self {
        let region = aws_sdk_s3::config::Region::new(config.aws_region.clone());

        let mut s3_config_builder = match (&config.aws_access_key_id, &config.aws_secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials = aws_sdk_s3::config::Credentials::new(
                    key_id.clone(),
                    secret.clone(),
                    None,
                    None,
                    "manual_config",
                );
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .credentials_provider(credentials)
            }
            _ => {
                // Environment, profile or instance credentials.
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        }
        .region(region);

        if let Some(endpoint) = &config.s3_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self { client, config }
    }

    /// Creates the uploads, renders and thumbs buckets when missing.
    pub async fn ensure_buckets(&self) -> Result<(), AppError> {
        let buckets = &self.config.buckets;
        for bucket in [&buckets.uploads, &buckets.renders, &buckets.thumbs] {
            self.ensure_bucket_exists(bucket).await?;
        }
        Ok(())
    }

    pub async fn ensure_bucket_exists(&self, bucket: &str) -> Result<(), AppError> {
        if self.client.head_bucket().bucket(bucket).send().await.is_err() {
            tracing::info!(bucket, "bucket does not exist, attempting to create");
            self.client
                .create_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(bucket, error = ?e, "failed to create bucket");
                    AppError::InternalServerError(format!("Failed to create S3 bucket: {}", e))
                })?;
        }

        // Some S3 providers reject bucket policies; objects still carry a
        // public-read ACL.
        if let Err(e) = self.set_public_policy(bucket).await {
            tracing::warn!(bucket, error = %e, "could not set public bucket policy");
        }
        Ok(())
    }

    async fn set_public_policy(&self, bucket: &str) -> Result<(), AppError> {
        let policy = serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "PublicReadGetObject",
                "Effect": "Allow",
                "Principal": "*",
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{}/*", bucket),
            }]
        });

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy.to_string())
            .send()
            .await
            .map_err(|e| {
                AppError::InternalServerError(format!("Failed to set bucket policy: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Service {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(aws_sdk_s3::types::ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(bucket, key, error = ?e, "S3 upload error");
                AppError::InternalServerError(format!("Failed to upload file to S3: {}", e))
            })?;

        Ok(self.public_url(bucket, key))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.config.public_url(bucket, key)
    }
}
