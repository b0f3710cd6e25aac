//! Object storage abstraction for problem and example images
//!
//! The reconciliation engine only needs four operations from storage. Each
//! gateway is bound to one bucket; object names are flat keys inside it.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::LocalFile;

pub mod factory;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

/// Storage capability consumed by the reconciliation engine
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Write a local file under `name`, replacing any existing object
    async fn upload(&self, file: &LocalFile, name: &str) -> Result<()>;

    /// Rename an object. Fails if `from` is missing or `to` is already taken.
    async fn move_object(&self, from: &str, to: &str) -> Result<()>;

    /// Delete an object by name
    async fn remove(&self, name: &str) -> Result<()>;

    /// Address the object is publicly served from
    async fn public_url(&self, name: &str) -> Result<String>;

    /// Get a human-readable identifier for this storage backend type
    fn storage_type(&self) -> &'static str;

    /// Prepare the bucket (create directories, validate access, etc.)
    async fn initialize(&self) -> Result<()>;
}

/// Storage configuration for a single bucket
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Local filesystem storage, one directory per bucket
    Local {
        root: String,
        bucket: String,
        public_base_url: String,
    },
    /// S3-compatible storage
    #[cfg(feature = "s3")]
    S3 {
        s3_config: crate::config::S3Config,
        bucket: String,
    },
}

impl StorageConfig {
    pub fn bucket(&self) -> &str {
        match self {
            StorageConfig::Local { bucket, .. } => bucket,
            #[cfg(feature = "s3")]
            StorageConfig::S3 { bucket, .. } => bucket,
        }
    }
}

/// Public URL of `name` under `base/bucket`, with the name percent-encoded
pub(crate) fn join_public_url(base: &str, bucket: &str, name: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        bucket,
        urlencoding::encode(name)
    )
}
