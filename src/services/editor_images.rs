use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::markdown::{image_markdown, remove_references};
use crate::models::{ImageRef, ImageSource, LocalFile};
use crate::utils::security::image_id_from_file_name;

/// The image list of a markdown draft while it is being edited.
///
/// Attached files stay local until the draft is saved; until then they are
/// referenced from the text by id and previewed through a `data:` URL.
#[derive(Debug, Clone, Default)]
pub struct EditorImages {
    images: Vec<ImageRef>,
}

impl EditorImages {
    pub fn new(images: Vec<ImageRef>) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn into_images(self) -> Vec<ImageRef> {
        self.images
    }

    /// Add a picked or pasted file. A file with the same name replaces the earlier one in place.
    pub fn attach(&mut self, file: LocalFile) -> ImageRef {
        let id = image_id_from_file_name(&file.file_name);
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let url = format!("data:{};base64,{}", content_type, STANDARD.encode(&file.data[..]));

        let image = ImageRef {
            id: id.clone(),
            name: id,
            url,
            source: ImageSource::Local(file),
        };

        match self.images.iter().position(|img| img.name == image.name) {
            Some(index) => {
                debug!("Replacing attached image {}", image.name);
                self.images[index] = image.clone();
            }
            None => self.images.push(image.clone()),
        }
        image
    }

    /// Markdown inserted into the text for an attached image.
    pub fn reference_markdown(image: &ImageRef) -> String {
        format!("{}\n", image_markdown(&image.name, &image.id))
    }

    /// Insert a reference to `image` at byte offset `position` and return the offset after it.
    pub fn insert_reference(&mut self, content: &mut String, position: usize, image: &ImageRef) -> Result<usize> {
        if position > content.len() || !content.is_char_boundary(position) {
            return Err(ReconcileError::Validation(format!(
                "Cannot insert image at position {}",
                position
            )));
        }

        let markdown = Self::reference_markdown(image);
        content.insert_str(position, &markdown);

        if !self.images.iter().any(|img| img.id == image.id) {
            self.images.push(image.clone());
        }
        Ok(position + markdown.len())
    }

    /// Drop the image at `index` and every `![name](id)` reference to it.
    pub fn remove(&mut self, index: usize, content: &mut String) -> Option<ImageRef> {
        if index >= self.images.len() {
            return None;
        }
        let image = self.images.remove(index);
        *content = remove_references(content, &image.name, &image.id);
        Some(image)
    }
}
