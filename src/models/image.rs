use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A file picked in the editor that has not been written to storage yet.
///
/// Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Arc<[u8]>,
}

impl LocalFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Where an image's bytes currently live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageSource {
    /// Already an object in storage under the image's `name`.
    #[default]
    Persisted,
    /// Attached in the editor; only the caller holds the bytes.
    Local(LocalFile),
}

/// An image embedded in a markdown document.
///
/// `id` is what the document's `![token](src)` references point at while the
/// image is being edited, `name` is the storage object key and `url` is the
/// address the image is displayed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip)]
    pub source: ImageSource,
}

impl ImageRef {
    pub fn persisted(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            source: ImageSource::Persisted,
        }
    }

    pub fn local(id: impl Into<String>, url: impl Into<String>, file: LocalFile) -> Self {
        Self {
            id: id.into(),
            name: file.file_name.clone(),
            url: url.into(),
            source: ImageSource::Local(file),
        }
    }

    /// True while the image only exists on the caller's side.
    pub fn is_new(&self) -> bool {
        matches!(self.source, ImageSource::Local(_))
    }

    pub fn local_file(&self) -> Option<&LocalFile> {
        match &self.source {
            ImageSource::Local(file) => Some(file),
            ImageSource::Persisted => None,
        }
    }

    /// Extension used when the image gets its final name.
    ///
    /// Falls back to the local file's content type and then to `bin` when the
    /// name has no extension.
    pub fn extension(&self) -> String {
        if let Some(ext) = Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
        {
            return ext.to_string();
        }

        self.local_file()
            .and_then(|file| file.content_type.as_deref())
            .and_then(mime_guess::get_mime_extensions_str)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| "bin".to_string())
    }

    /// Drops the local file handle, leaving the reference as it is stored.
    pub fn into_persisted(self) -> Self {
        Self {
            source: ImageSource::Persisted,
            ..self
        }
    }
}

/// Markdown text together with the images it embeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdContent {
    pub text: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Whether the edited image list differs from what was loaded, position by position.
pub fn images_changed(current: &[ImageRef], original: &[ImageRef]) -> bool {
    if current.len() != original.len() {
        return true;
    }
    current.iter().zip(original).any(|(cur, orig)| {
        cur.id != orig.id || cur.name != orig.name || cur.url != orig.url
    })
}
