//! Local filesystem storage gateway

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

use super::{join_public_url, StorageGateway};
use crate::models::LocalFile;
use crate::utils::security::validate_object_name;

/// Stores each bucket as a directory under `root`
pub struct LocalStorageGateway {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalStorageGateway {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Directory holding this gateway's objects
    pub fn bucket_path(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// Filesystem path of an object, after validating its name
    pub fn object_path(&self, name: &str) -> Result<PathBuf> {
        let name = validate_object_name(name)?;
        Ok(self.bucket_path().join(name))
    }

    async fn exists(path: &Path) -> Result<bool> {
        fs::try_exists(path)
            .await
            .map_err(|e| anyhow!("Failed to check {}: {}", path.display(), e))
    }
}

#[async_trait]
impl StorageGateway for LocalStorageGateway {
    async fn upload(&self, file: &LocalFile, name: &str) -> Result<()> {
        let path = self.object_path(name)?;
        fs::create_dir_all(self.bucket_path()).await?;

        fs::write(&path, &file.data[..])
            .await
            .map_err(|e| anyhow!("Error uploading image {}: {}", name, e))?;

        info!("Stored image locally: {} ({} bytes)", path.display(), file.len());
        Ok(())
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<()> {
        let source = self.object_path(from)?;
        let destination = self.object_path(to)?;

        if !Self::exists(&source).await? {
            return Err(anyhow!("Object not found: {}", from));
        }
        if Self::exists(&destination).await? {
            return Err(anyhow!("The resource already exists: {}", to));
        }

        fs::rename(&source, &destination)
            .await
            .map_err(|e| anyhow!("Error renaming image {} to {}: {}", from, to, e))?;

        info!("Moved image {} -> {}", from, to);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let path = self.object_path(name)?;
        match fs::remove_file(&path).await {
            Ok(_) => {
                info!("Deleted image: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Image already deleted: {}", path.display());
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete image {}: {}", path.display(), e);
                Err(anyhow!("Error deleting image {}: {}", name, e))
            }
        }
    }

    async fn public_url(&self, name: &str) -> Result<String> {
        validate_object_name(name)?;
        Ok(join_public_url(&self.public_base_url, &self.bucket, name))
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }

    async fn initialize(&self) -> Result<()> {
        let dir = self.bucket_path();
        if let Err(e) = fs::create_dir_all(&dir).await {
            error!("Failed to create bucket directory {:?}: {}", dir, e);
            return Err(anyhow!("Failed to create bucket directory: {}", e));
        }
        info!("Ensured bucket directory exists: {:?}", dir);
        Ok(())
    }
}
