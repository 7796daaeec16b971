//! The in-memory document model.

mod metadata;

use std::path::{Path, PathBuf};

pub use metadata::Metadata;

use crate::error::Result;

/// Extension of every generated content file.
pub const CONTENT_EXTENSION: &str = "xhtml";

/// One unit of content, appended through [`Document::add_section`].
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    /// Pre-rendered XHTML body fragment.
    pub content: String,
    pub exclude_from_contents: bool,
    /// Placed before the contents page in reading order.
    pub is_front_matter: bool,
    /// File name inside the content folder, extension included.
    pub filename: String,
}

/// Optional flags for [`Document::add_section_with`].
#[derive(Debug, Clone, Default)]
pub struct SectionOptions {
    pub exclude_from_contents: bool,
    pub is_front_matter: bool,
    /// Overrides the generated `s{index}` file stem.
    pub filename: Option<String>,
}

impl SectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_from_contents(mut self) -> Self {
        self.exclude_from_contents = true;
        self
    }

    pub fn front_matter(mut self) -> Self {
        self.is_front_matter = true;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// A document under construction.
///
/// Built up with [`add_section`](Self::add_section), [`add_css`](Self::add_css)
/// and [`add_font`](Self::add_font), then packaged with
/// [`write_epub`](Self::write_epub) or [`write_files`](Self::write_files).
///
/// # Example
///
/// ```no_run
/// use folio::{Document, Metadata};
///
/// # async fn run() -> folio::Result<()> {
/// let mut doc = Document::new(Metadata::new("My Book", "Me", "cover.png"))?;
/// doc.add_section("Chapter 1", "<p>It begins.</p>");
/// doc.write_epub("out", "my-book").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    metadata: Metadata,
    css: String,
    sections: Vec<Section>,
    images: Vec<PathBuf>,
    cover: PathBuf,
    fonts: Vec<PathBuf>,
    show_contents: bool,
}

impl Document {
    /// Validate `metadata` and create an empty document from it.
    pub fn new(metadata: Metadata) -> Result<Self> {
        metadata.validate()?;

        Ok(Self {
            css: String::new(),
            sections: Vec::new(),
            images: metadata.images.clone(),
            cover: metadata.cover.clone(),
            fonts: metadata.fonts.clone(),
            show_contents: metadata.show_contents,
            metadata,
        })
    }

    /// Append a section with default flags. Returns its 1-based index.
    pub fn add_section(&mut self, title: impl Into<String>, content: impl Into<String>) -> usize {
        self.add_section_with(title, content, SectionOptions::default())
    }

    /// Append a section. Returns its 1-based index.
    pub fn add_section_with(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        options: SectionOptions,
    ) -> usize {
        let index = self.sections.len() + 1;
        let stem = match options.filename {
            Some(name) if !name.trim().is_empty() => name,
            _ => format!("s{index}"),
        };

        self.sections.push(Section {
            title: title.into(),
            content: content.into(),
            exclude_from_contents: options.exclude_from_contents,
            is_front_matter: options.is_front_matter,
            filename: with_extension(&stem),
        });
        index
    }

    /// Replace the shared stylesheet.
    pub fn add_css(&mut self, content: impl Into<String>) {
        self.css = content.into();
    }

    /// Append a font. The file is only read when the manifest is built.
    pub fn add_font(&mut self, path: impl Into<PathBuf>) {
        self.fonts.push(path.into());
    }

    /// Append an image asset. The file is only read when the manifest is built.
    pub fn add_image(&mut self, path: impl Into<PathBuf>) {
        self.images.push(path.into());
    }

    pub fn set_show_contents(&mut self, show: bool) {
        self.show_contents = show;
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section by 1-based index.
    pub fn section(&self, index: usize) -> Option<&Section> {
        index.checked_sub(1).and_then(|i| self.sections.get(i))
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn fonts(&self) -> &[PathBuf] {
        &self.fonts
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn cover(&self) -> &Path {
        &self.cover
    }

    pub fn show_contents(&self) -> bool {
        self.show_contents
    }
}

fn with_extension(stem: &str) -> String {
    let suffix = format!(".{CONTENT_EXTENSION}");
    if stem.ends_with(&suffix) {
        stem.to_string()
    } else {
        format!("{stem}{suffix}")
    }
}
