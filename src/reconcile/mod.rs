//! Image reconciliation.
//!
//! Given a document, the images currently attached to it and the images that
//! were persisted the last time it was saved, [`Reconciler::reconcile`]:
//!
//! 1. orders the attached images by first reference in the document,
//! 2. deletes persisted images the document no longer references,
//! 3. stages every surviving image under a temporary name,
//! 4. commits them to `<prefix>-<n>.<ext>` and rewrites the document.
//!
//! Storage calls are awaited one at a time in document order. Nothing is
//! rolled back on failure; callers must not run two saves for the same
//! document concurrently.

use std::sync::Arc;

use tracing::info;

use crate::error::{ReconcileError, Result};
use crate::markdown::extract_order;
use crate::models::ImageRef;
use crate::notification::ProgressSink;
use crate::storage::StorageGateway;

pub mod deletion;
pub mod staging;

pub use deletion::{delete_removed, removed_images};
pub use staging::{commit_images, final_name, stage_images, StagedImage};

#[derive(Debug, Clone)]
pub struct ReconciliationRequest {
    pub document: String,
    /// Images attached to the draft; their order here does not matter.
    pub current_images: Vec<ImageRef>,
    /// Images persisted by the previous save.
    pub previous_images: Vec<ImageRef>,
    /// Final names are `<name_prefix>-<n>.<ext>`.
    pub name_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub document: String,
    /// Images in first-reference order, under their final names.
    pub final_images: Vec<ImageRef>,
}

pub struct Reconciler {
    gateway: Arc<dyn StorageGateway>,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self { gateway }
    }

    /// Reconcile a document's images against storage.
    pub async fn reconcile(
        &self,
        request: ReconciliationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<ReconciliationResult> {
        let ordered = extract_order(&request.document, &request.current_images);
        self.run(
            ordered,
            &request.previous_images,
            &request.name_prefix,
            request.document,
            progress,
        )
        .await
    }

    /// Reconcile an image list that has no document; the list order is final.
    ///
    /// Entries repeating an earlier id are ignored.
    pub async fn reconcile_sequence(
        &self,
        images: &[ImageRef],
        previous_images: &[ImageRef],
        name_prefix: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ImageRef>> {
        let mut ordered: Vec<ImageRef> = Vec::with_capacity(images.len());
        for image in images {
            if !ordered.iter().any(|img| img.id == image.id) {
                ordered.push(image.clone());
            }
        }

        let result = self
            .run(ordered, previous_images, name_prefix, String::new(), progress)
            .await?;
        Ok(result.final_images)
    }

    async fn run(
        &self,
        ordered: Vec<ImageRef>,
        previous_images: &[ImageRef],
        name_prefix: &str,
        mut document: String,
        progress: &dyn ProgressSink,
    ) -> Result<ReconciliationResult> {
        validate_prefix(name_prefix)?;
        let gateway = self.gateway.as_ref();

        let removed = removed_images(previous_images, &ordered).len();
        if removed > 0 {
            progress.progress(&format!("Deleting {} removed image(s)...", removed));
            delete_removed(gateway, previous_images, &ordered).await?;
            progress.progress("Removed images deleted successfully. Processing remaining images...");
        }

        progress.progress("Preparing images...");
        let staged = stage_images(gateway, &ordered, &mut document).await?;

        progress.progress("Finalizing images...");
        let final_images = commit_images(gateway, staged, name_prefix, &mut document).await?;

        progress.progress("Image processing completed successfully");
        info!(
            "Reconciled {} image(s) under prefix {} ({} removed) on {} storage",
            final_images.len(),
            name_prefix,
            removed,
            gateway.storage_type()
        );

        Ok(ReconciliationResult {
            document,
            final_images,
        })
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.trim().is_empty() {
        return Err(ReconcileError::Validation("Image name prefix cannot be empty".to_string()));
    }
    if prefix.contains('/') || prefix.contains('\\') {
        return Err(ReconcileError::Validation(format!(
            "Image name prefix cannot contain path separators: {}",
            prefix
        )));
    }
    Ok(())
}
