//! S3-compatible storage gateway

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region as AwsRegion;

use super::{join_public_url, StorageGateway};
use crate::config::S3Config;
use crate::models::LocalFile;
use crate::utils::security::validate_object_name;

const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 100;

/// Images are served with a one hour cache, like the dashboard's uploads
const CACHE_CONTROL: &str = "max-age=3600";

#[derive(Debug, Clone)]
pub struct S3StorageGateway {
    client: Client,
    config: S3Config,
    bucket: String,
}

impl S3StorageGateway {
    pub fn new(config: S3Config, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();

        // Validate required fields
        if bucket.is_empty() {
            return Err(anyhow!("Bucket name is required"));
        }
        if config.access_key_id.is_empty() {
            return Err(anyhow!("Access key ID is required"));
        }
        if config.secret_access_key.is_empty() {
            return Err(anyhow!("Secret access key is required"));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None, // session token
            None, // expiry
            "probdesk-s3-storage",
        );

        let region = if config.region.is_empty() {
            "us-east-1".to_string()
        } else {
            config.region.clone()
        };

        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .region(AwsRegion::new(region))
            .credentials_provider(credentials)
            .behavior_version_latest();

        // Set custom endpoint if provided (for S3-compatible services)
        if let Some(endpoint_url) = &config.endpoint_url {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
            info!("Using custom S3 endpoint: {}", endpoint_url);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Ok(Self { client, config, bucket })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let error_msg = format!("{:?}", e);
                if error_msg.contains("NotFound") || error_msg.contains("404") {
                    Ok(false)
                } else {
                    Err(anyhow!("Failed to check object existence {}: {}", key, e))
                }
            }
        }
    }

    /// Retry wrapper for S3 operations with exponential backoff
    async fn retry_operation<T, F, Fut>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("S3 operation '{}' succeeded after {} retries", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(e) if attempt < MAX_RETRIES => {
                    let delay_ms = BASE_DELAY_MS * 2u64.pow(attempt);
                    warn!(
                        "S3 operation '{}' failed (attempt {}/{}), retrying in {}ms: {}",
                        operation_name,
                        attempt + 1,
                        MAX_RETRIES + 1,
                        delay_ms,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "S3 operation '{}' failed after {} attempts: {}",
                        operation_name,
                        MAX_RETRIES + 1,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl StorageGateway for S3StorageGateway {
    async fn upload(&self, file: &LocalFile, name: &str) -> Result<()> {
        let key = validate_object_name(name)?.to_string();
        info!("Uploading image to S3: {}/{}", self.bucket, key);

        self.retry_operation(&format!("upload: {}", key), || {
            let mut request = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .cache_control(CACHE_CONTROL)
                .body(ByteStream::from(file.data.to_vec()));
            if let Some(content_type) = &file.content_type {
                request = request.content_type(content_type);
            }
            let key = key.clone();

            async move {
                request
                    .send()
                    .await
                    .map_err(|e| anyhow!("Error uploading image {}: {}", key, e))?;
                Ok::<(), anyhow::Error>(())
            }
        })
        .await?;

        info!("Successfully uploaded image: {}", key);
        Ok(())
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<()> {
        validate_object_name(from)?;
        validate_object_name(to)?;

        if self.object_exists(to).await? {
            return Err(anyhow!("The resource already exists: {}", to));
        }

        let copy_source = format!("{}/{}", self.bucket, urlencoding::encode(from));
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(copy_source)
            .key(to)
            .send()
            .await
            .map_err(|e| anyhow!("Error renaming image {} to {}: {}", from, to, e))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(from)
            .send()
            .await
            .map_err(|e| anyhow!("Copied {} to {} but failed to delete the source: {}", from, to, e))?;

        info!("Moved S3 object {} -> {}", from, to);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let key = validate_object_name(name)?;
        info!("Deleting image from S3: {}/{}", self.bucket, key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("Error deleting image {}: {}", key, e))?;

        Ok(())
    }

    async fn public_url(&self, name: &str) -> Result<String> {
        let key = validate_object_name(name)?;

        let url = match (&self.config.public_base_url, &self.config.endpoint_url) {
            (Some(base), _) => join_public_url(base, &self.bucket, key),
            (None, Some(endpoint)) => join_public_url(endpoint, &self.bucket, key),
            (None, None) => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket,
                self.config.region,
                urlencoding::encode(key)
            ),
        };
        Ok(url)
    }

    fn storage_type(&self) -> &'static str {
        "s3"
    }

    async fn initialize(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to access S3 bucket {}: {}", self.bucket, e))?;

        info!("S3 storage ready for bucket: {}", self.bucket);
        Ok(())
    }
}
