use anyhow::{anyhow, Result};
use std::env;
use tracing::info;

pub const DEFAULT_STORAGE_ROOT: &str = "./storage";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8000/storage/v1/object/public";
pub const DEFAULT_PROBLEM_IMAGES_BUCKET: &str = "problem-images";
pub const DEFAULT_EXAMPLE_IMAGES_BUCKET: &str = "example-images";

/// Credentials and endpoint for S3-compatible storage
#[derive(Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: Option<String>,
    /// Overrides the URL images are served from (CDN, public bucket domain)
    pub public_base_url: Option<String>,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_root: String,
    pub public_base_url: String,
    pub problem_images_bucket: String,
    pub example_images_bucket: String,
    pub s3_enabled: bool,
    pub s3_config: Option<S3Config>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine; the environment may already be populated
        let _ = dotenvy::dotenv();

        let s3_enabled = env::var("S3_ENABLED")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let s3_config = if s3_enabled {
            Some(Self::s3_config_from_env()?)
        } else {
            None
        };

        let config = Config {
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| DEFAULT_STORAGE_ROOT.to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string()),
            problem_images_bucket: env::var("PROBLEM_IMAGES_BUCKET")
                .unwrap_or_else(|_| DEFAULT_PROBLEM_IMAGES_BUCKET.to_string()),
            example_images_bucket: env::var("EXAMPLE_IMAGES_BUCKET")
                .unwrap_or_else(|_| DEFAULT_EXAMPLE_IMAGES_BUCKET.to_string()),
            s3_enabled,
            s3_config,
        };

        info!(
            "Loaded configuration: storage={} root={} problem_bucket={} example_bucket={}",
            if config.s3_enabled { "s3" } else { "local" },
            config.storage_root,
            config.problem_images_bucket,
            config.example_images_bucket
        );

        Ok(config)
    }

    fn s3_config_from_env() -> Result<S3Config> {
        let access_key_id = env::var("S3_ACCESS_KEY_ID")
            .map_err(|_| anyhow!("S3_ACCESS_KEY_ID is required when S3_ENABLED is set"))?;
        let secret_access_key = env::var("S3_SECRET_ACCESS_KEY")
            .map_err(|_| anyhow!("S3_SECRET_ACCESS_KEY is required when S3_ENABLED is set"))?;

        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(anyhow!("S3 credentials cannot be empty"));
        }

        Ok(S3Config {
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id,
            secret_access_key,
            endpoint_url: env::var("S3_ENDPOINT_URL").ok().filter(|v| !v.is_empty()),
            public_base_url: env::var("S3_PUBLIC_BASE_URL").ok().filter(|v| !v.is_empty()),
        })
    }
}
