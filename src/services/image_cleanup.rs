use futures::future::join_all;
use tracing::{error, info};

use crate::error::{ReconcileError, Result, StorageOperation};
use crate::models::ImageRef;
use crate::storage::StorageGateway;

/// Delete every image of a problem that is being deleted.
///
/// Unlike reconciliation, order does not matter here, so deletes run
/// concurrently. All of them are attempted; failures are counted and reported
/// together.
pub async fn purge_images(gateway: &dyn StorageGateway, images: &[ImageRef]) -> Result<usize> {
    if images.is_empty() {
        return Ok(0);
    }

    let results = join_all(images.iter().map(|image| gateway.remove(&image.name))).await;

    let failed: Vec<(&ImageRef, anyhow::Error)> = images
        .iter()
        .zip(results)
        .filter_map(|(image, result)| result.err().map(|e| (image, e)))
        .collect();

    if failed.is_empty() {
        info!("Purged {} image(s)", images.len());
        return Ok(images.len());
    }

    for (image, e) in &failed {
        error!("Failed to delete image {}: {}", image.name, e);
    }

    Err(ReconcileError::Storage {
        operation: StorageOperation::Delete,
        object: failed
            .iter()
            .map(|(image, _)| image.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        message: format!(
            "Error deleting {} image(s). Problem deleted, but some images may remain.",
            failed.len()
        ),
    })
}
