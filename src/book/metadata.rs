//! Title metadata and its validation.

use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::error::{Error, Result};

/// Descriptive metadata for a document (Dublin Core + calibre extensions).
///
/// `title`, `author` and `cover` are required; everything else has a
/// default. Validation happens once, in [`Document::new`](super::Document::new).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Metadata {
    pub title: String,
    pub author: String,
    /// Path to the cover image on disk.
    pub cover: PathBuf,
    /// Unique identifier; derived from title and author when absent.
    pub id: Option<String>,
    pub series: Option<String>,
    pub sequence: Option<u32>,
    /// Sort form of the author's name.
    #[cfg_attr(feature = "serde", serde(alias = "file_as"))]
    pub file_as: Option<String>,
    pub genre: Option<String>,
    pub tags: Vec<String>,
    pub copyright: Option<String>,
    pub publisher: Option<String>,
    pub published: Option<String>,
    pub language: String,
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(alias = "show_contents"))]
    pub show_contents: bool,
    #[cfg_attr(feature = "serde", serde(alias = "contents_title"))]
    pub contents_title: String,
    pub source: Option<String>,
    pub images: Vec<PathBuf>,
    pub fonts: Vec<PathBuf>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            cover: PathBuf::new(),
            id: None,
            series: None,
            sequence: None,
            file_as: None,
            genre: None,
            tags: Vec::new(),
            copyright: None,
            publisher: None,
            published: None,
            language: "en".to_string(),
            description: None,
            show_contents: true,
            contents_title: "Contents".to_string(),
            source: None,
            images: Vec::new(),
            fonts: Vec::new(),
        }
    }
}

impl Metadata {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        cover: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            cover: cover.into(),
            ..Default::default()
        }
    }

    /// Parse metadata from a JSON object.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_series(mut self, series: impl Into<String>, sequence: u32) -> Self {
        self.series = Some(series.into());
        self.sequence = Some(sequence);
        self
    }

    pub fn with_file_as(mut self, file_as: impl Into<String>) -> Self {
        self.file_as = Some(file_as.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = Some(copyright.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_published(mut self, date: impl Into<String>) -> Self {
        self.published = Some(date.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_show_contents(mut self, show: bool) -> Self {
        self.show_contents = show;
        self
    }

    pub fn with_contents_title(mut self, title: impl Into<String>) -> Self {
        self.contents_title = title.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }

    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.fonts.push(path.into());
        self
    }

    /// Check that every required field is present and non-blank.
    ///
    /// Fields are checked in the order title, author, cover; the first
    /// blank one is reported.
    pub fn validate(&self) -> Result<()> {
        if is_blank(&self.title) {
            return Err(Error::MissingMetadata { field: "title" });
        }
        if is_blank(&self.author) {
            return Err(Error::MissingMetadata { field: "author" });
        }
        if is_blank_path(&self.cover) {
            return Err(Error::MissingMetadata { field: "cover" });
        }
        Ok(())
    }

    /// The package identifier: `id` if set, otherwise a `urn:uuid:` derived
    /// from title and author so repeated builds agree.
    pub fn identifier(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => derived_uuid(&self.title, &self.author),
        }
    }

    /// Sort name for the author, falling back to the display name.
    pub fn author_sort(&self) -> &str {
        match self.file_as.as_deref() {
            Some(file_as) if !file_as.trim().is_empty() => file_as,
            _ => &self.author,
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn is_blank_path(path: &Path) -> bool {
    path.to_string_lossy().trim().is_empty()
}

fn derived_uuid(title: &str, author: &str) -> String {
    let mut hasher = sha1_smol::Sha1::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\0");
    hasher.update(author.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hasher.digest().bytes()[..16]);

    // Version 5 (name-based, SHA-1), RFC 4122 variant
    bytes[6] = (bytes[6] & 0x0f) | 0x50;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "urn:uuid:{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
