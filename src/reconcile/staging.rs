//! The two renaming passes.
//!
//! Pass 1 moves every surviving image into a temporary namespace (uploading
//! new ones straight into it); pass 2 moves each one to its final name. After
//! pass 1 no final name is held by an image of this request, so pass 2 can
//! reorder images freely without one rename landing on a name that is still
//! occupied.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{ReconcileError, Result, StorageOperation};
use crate::markdown::{resolve_source, rewrite_matching, rewrite_references};
use crate::models::{ImageRef, ImageSource};
use crate::storage::StorageGateway;

/// An image parked under its temporary name between the two passes.
#[derive(Debug, Clone)]
pub struct StagedImage {
    pub temp_name: String,
    pub temp_url: String,
    pub original_name: String,
    pub extension: String,
    pub source: ImageSource,
}

/// `<prefix>-<sequence>.<ext>`, with `sequence` starting at 1.
pub fn final_name(prefix: &str, sequence: usize, extension: &str) -> String {
    format!("{}-{}.{}", prefix, sequence, extension)
}

/// Temporary name for `image`, unique among `taken`.
///
/// New images get `new_<counter>_<name>`, persisted ones `existing_<name>`.
/// If that still clashes with a name in this request a numeric tag is added.
fn temp_name_for(image: &ImageRef, new_counter: usize, taken: &HashSet<String>) -> String {
    let base = match image.source {
        ImageSource::Local(_) => format!("new_{}_{}", new_counter, image.name),
        ImageSource::Persisted => format!("existing_{}", image.name),
    };

    if !taken.contains(&base) {
        return base;
    }

    let mut tag = 2;
    loop {
        let candidate = match image.source {
            ImageSource::Local(_) => format!("new_{}_{}_{}", new_counter, tag, image.name),
            ImageSource::Persisted => format!("existing_{}_{}", tag, image.name),
        };
        if !taken.contains(&candidate) {
            return candidate;
        }
        tag += 1;
    }
}

async fn resolve_url(gateway: &dyn StorageGateway, name: &str) -> Result<String> {
    gateway
        .public_url(name)
        .await
        .map_err(|e| ReconcileError::storage(StorageOperation::PublicUrl, name, e))
}

/// Pass 1: upload new images and move persisted ones to temporary names.
///
/// References that resolve to each image (id first, then url) are rewritten to the temporary
/// name and url. Stops at the first failure; anything already staged stays
/// staged.
pub async fn stage_images(
    gateway: &dyn StorageGateway,
    ordered: &[ImageRef],
    document: &mut String,
) -> Result<Vec<StagedImage>> {
    let mut taken: HashSet<String> = ordered
        .iter()
        .filter(|img| !img.is_new())
        .map(|img| img.name.clone())
        .collect();
    let mut staged = Vec::with_capacity(ordered.len());
    let mut new_counter = 1;

    for (index, image) in ordered.iter().enumerate() {
        let temp_name = temp_name_for(image, new_counter, &taken);

        match &image.source {
            ImageSource::Local(file) => {
                new_counter += 1;
                gateway
                    .upload(file, &temp_name)
                    .await
                    .map_err(|e| ReconcileError::storage(StorageOperation::Upload, &temp_name, e))?;
                debug!("Uploaded new image {} as {}", image.name, temp_name);
            }
            ImageSource::Persisted => {
                gateway
                    .move_object(&image.name, &temp_name)
                    .await
                    .map_err(|e| ReconcileError::storage(StorageOperation::Move, &image.name, e))?;
                debug!("Staged existing image {} as {}", image.name, temp_name);
            }
        }

        let temp_url = resolve_url(gateway, &temp_name).await?;

        *document = rewrite_matching(
            document,
            |src| resolve_source(src, ordered) == Some(index),
            &temp_name,
            &temp_url,
        )?;

        taken.insert(temp_name.clone());
        staged.push(StagedImage {
            temp_name,
            temp_url,
            original_name: image.name.clone(),
            extension: image.extension(),
            source: image.source.clone(),
        });
    }

    info!("Staged {} image(s) under temporary names", staged.len());
    Ok(staged)
}

/// Pass 2: move each staged image to `<prefix>-<n>.<ext>` in order.
///
/// Stops at the first failure; images already committed keep their final names.
pub async fn commit_images(
    gateway: &dyn StorageGateway,
    staged: Vec<StagedImage>,
    prefix: &str,
    document: &mut String,
) -> Result<Vec<ImageRef>> {
    let mut committed = Vec::with_capacity(staged.len());

    for (index, image) in staged.into_iter().enumerate() {
        let name = final_name(prefix, index + 1, &image.extension);

        gateway
            .move_object(&image.temp_name, &name)
            .await
            .map_err(|e| ReconcileError::storage(StorageOperation::Move, &image.temp_name, e))?;

        let url = resolve_url(gateway, &name).await?;
        *document = rewrite_references(document, &[image.temp_url.as_str()], &name, &url)?;

        debug!("Committed {} (was {}) as {}", image.temp_name, image.original_name, name);
        committed.push(ImageRef {
            id: name.clone(),
            name,
            url,
            source: image.source,
        });
    }

    info!("Committed {} image(s) to final names", committed.len());
    Ok(committed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalFile;

    #[test]
    fn test_final_names() {
        assert_eq!(final_name("42-problem", 1, "png"), "42-problem-1.png");
        assert_eq!(final_name("42-problem", 2, "jpg"), "42-problem-2.jpg");
        assert_eq!(final_name("7-example", 10, "gif"), "7-example-10.gif");
    }

    #[test]
    fn test_temp_names() {
        let persisted = ImageRef::persisted("a", "42-problem-1.png", "http://x/a");
        let new = ImageRef::local("b.png", "data:", LocalFile::new("b.png", vec![1u8]));
        let mut taken = HashSet::new();

        assert_eq!(temp_name_for(&persisted, 1, &taken), "existing_42-problem-1.png");
        assert_eq!(temp_name_for(&new, 3, &taken), "new_3_b.png");

        taken.insert("existing_42-problem-1.png".to_string());
        taken.insert("existing_2_42-problem-1.png".to_string());
        assert_eq!(temp_name_for(&persisted, 1, &taken), "existing_3_42-problem-1.png");
    }
}
