//! JSON project files describing a whole document.
//!
//! ```json
//! {
//!   "metadata": { "title": "T", "author": "A", "cover": "cover.jpg" },
//!   "css": "style.css",
//!   "fonts": ["fonts/Serif.ttf"],
//!   "sections": [
//!     { "title": "Copyright", "file": "copyright.html", "frontMatter": true },
//!     { "title": "Chapter 1", "file": "ch1.html" }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the project
//! file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::book::{Document, Metadata, SectionOptions};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub metadata: Metadata,
    /// Stylesheet file.
    #[serde(default)]
    pub css: Option<PathBuf>,
    #[serde(default)]
    pub fonts: Vec<PathBuf>,
    #[serde(default)]
    pub sections: Vec<ProjectSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSection {
    pub title: String,
    /// File holding the section's XHTML fragment.
    pub file: PathBuf,
    #[serde(default, alias = "exclude_from_contents")]
    pub exclude_from_contents: bool,
    #[serde(default, alias = "front_matter")]
    pub front_matter: bool,
    #[serde(default)]
    pub filename: Option<String>,
}

impl Project {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a project file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Build a document, reading section and stylesheet files below `base`.
    pub async fn into_document(self, base: &Path) -> Result<Document> {
        let mut metadata = self.metadata;
        // Keep blank covers blank so validation reports them
        if !metadata.cover.to_string_lossy().trim().is_empty() {
            metadata.cover = base.join(&metadata.cover);
        }
        metadata.images = metadata.images.iter().map(|p| base.join(p)).collect();
        metadata.fonts = metadata.fonts.iter().map(|p| base.join(p)).collect();

        let mut doc = Document::new(metadata)?;

        if let Some(css) = self.css {
            doc.add_css(read_text(&base.join(css)).await?);
        }
        for font in self.fonts {
            doc.add_font(base.join(font));
        }
        for section in self.sections {
            let content = read_text(&base.join(&section.file)).await?;
            let mut options = SectionOptions::new();
            options.exclude_from_contents = section.exclude_from_contents;
            options.is_front_matter = section.front_matter;
            options.filename = section.filename;
            doc.add_section_with(section.title, content, options);
        }

        debug!(sections = doc.section_count(), "Loaded project");
        Ok(doc)
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::AssetLoad {
            path: path.to_path_buf(),
            source,
        })
}
