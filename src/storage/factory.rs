//! Factory for creating storage gateways based on configuration

use anyhow::Result;
use std::sync::Arc;

use super::local::LocalStorageGateway;
use super::{StorageConfig, StorageGateway};
use crate::config::Config;

#[cfg(feature = "s3")]
use super::s3::S3StorageGateway;

/// Create and initialize a storage gateway for the configured bucket
pub async fn create_storage_gateway(config: StorageConfig) -> Result<Arc<dyn StorageGateway>> {
    match config {
        StorageConfig::Local { root, bucket, public_base_url } => {
            let gateway = LocalStorageGateway::new(root, bucket, public_base_url);
            gateway.initialize().await?;
            Ok(Arc::new(gateway))
        }
        #[cfg(feature = "s3")]
        StorageConfig::S3 { s3_config, bucket } => {
            let gateway = S3StorageGateway::new(s3_config, bucket)?;
            gateway.initialize().await?;
            Ok(Arc::new(gateway))
        }
    }
}

/// Pick local or S3 storage for `bucket` from the loaded configuration
pub fn storage_config_from_env(config: &Config, bucket: &str) -> StorageConfig {
    let local = || StorageConfig::Local {
        root: config.storage_root.clone(),
        bucket: bucket.to_string(),
        public_base_url: config.public_base_url.clone(),
    };

    if config.s3_enabled {
        #[cfg(feature = "s3")]
        {
            if let Some(s3_config) = &config.s3_config {
                StorageConfig::S3 {
                    s3_config: s3_config.clone(),
                    bucket: bucket.to_string(),
                }
            } else {
                // S3 enabled but no config, fall back to local
                tracing::warn!("S3 storage enabled without credentials, using local storage");
                local()
            }
        }
        #[cfg(not(feature = "s3"))]
        {
            // S3 requested but not compiled in
            tracing::warn!("S3 storage requested but S3 feature not compiled in, using local storage");
            local()
        }
    } else {
        local()
    }
}
