//! Removal of images that the edited document no longer references.

use tracing::{info, warn};

use crate::error::{ReconcileError, Result, StorageOperation};
use crate::models::ImageRef;
use crate::storage::StorageGateway;

/// Previously persisted images that nothing in `keep` still points at.
///
/// Identity is by `url` or `name`; only persisted images in `keep` protect a
/// name, since a new image's name is just its upload file name. Each removed
/// name appears once.
pub fn removed_images(previous: &[ImageRef], keep: &[ImageRef]) -> Vec<ImageRef> {
    let mut removed: Vec<ImageRef> = Vec::new();

    for prev in previous {
        let kept = keep.iter().any(|cur| {
            cur.url == prev.url || (!cur.is_new() && cur.name == prev.name)
        });
        if !kept && !removed.iter().any(|r| r.name == prev.name) {
            removed.push(prev.clone());
        }
    }

    removed
}

/// Deletes every removed image, one at a time, stopping at the first failure.
///
/// Images deleted before a failure stay deleted. Returns how many were removed.
pub async fn delete_removed(gateway: &dyn StorageGateway, previous: &[ImageRef], keep: &[ImageRef]) -> Result<usize> {
    let removed = removed_images(previous, keep);

    for (index, image) in removed.iter().enumerate() {
        if let Err(e) = gateway.remove(&image.name).await {
            warn!(
                "Deletion stopped at {} after {} of {} removed image(s)",
                image.name,
                index,
                removed.len()
            );
            return Err(ReconcileError::storage(StorageOperation::Delete, &image.name, e));
        }
        info!("Deleted removed image {}", image.name);
    }

    Ok(removed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalFile;

    fn persisted(name: &str) -> ImageRef {
        ImageRef::persisted(name, name, format!("http://x/{}", name))
    }

    #[test]
    fn test_removed_by_url_or_name() {
        let previous = vec![persisted("x.png"), persisted("y.png"), persisted("z.png")];

        let mut moved_url = persisted("z.png");
        moved_url.url = "http://cdn/z.png".to_string();
        let keep = vec![persisted("x.png"), moved_url];

        let removed = removed_images(&previous, &keep);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].name, "y.png");
    }

    #[test]
    fn test_new_image_does_not_protect_a_name() {
        let previous = vec![persisted("x.png")];
        let file = LocalFile::new("x.png", vec![1u8]);
        let keep = vec![ImageRef::local("x.png", "data:image/png;base64,AQ==", file)];

        assert_eq!(removed_images(&previous, &keep).len(), 1);
    }

    #[test]
    fn test_duplicate_previous_entries_are_removed_once() {
        let previous = vec![persisted("y.png"), persisted("y.png")];
        assert_eq!(removed_images(&previous, &[]).len(), 1);
    }
}
