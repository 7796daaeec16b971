//! # folio
//!
//! Build EPUB 2 packages from title metadata, ordered XHTML sections, a cover
//! image and optional images, fonts and CSS.
//!
//! ## Quick Start
//!
//! ```no_run
//! use folio::{Document, Metadata, SectionOptions};
//!
//! # async fn run() -> folio::Result<()> {
//! let metadata = Metadata::new("My Book", "Author Name", "art/cover.jpg")
//!     .with_language("en")
//!     .with_genre("Fiction");
//!
//! let mut doc = Document::new(metadata)?;
//! doc.add_section_with(
//!     "Copyright",
//!     "<p>Copyright 2024</p>",
//!     SectionOptions::new().front_matter().exclude_from_contents(),
//! );
//! doc.add_section("Chapter 1", "<h1>Chapter 1</h1><p>It begins.</p>");
//! doc.add_css("p { text-indent: 1em; }");
//! doc.add_font("fonts/Serif.ttf");
//!
//! // Single archive: out/my-book.epub
//! doc.write_epub("out", "my-book").await?;
//!
//! // Or the same files as a directory tree
//! doc.write_files("out/my-book").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Package Layout
//!
//! Every package starts with an uncompressed `mimetype` entry, followed by
//! `META-INF/container.xml` and the control files under `OEBPF/`. The
//! complete, ordered list of entries is available through
//! [`Document::manifest`].

pub mod book;
pub mod epub;
pub mod error;
#[cfg(feature = "serde")]
pub mod project;
pub(crate) mod util;

pub use book::{CONTENT_EXTENSION, Document, Metadata, Section, SectionOptions};
pub use epub::{
    EpubConfig, EpubRenderer, FileContent, Manifest, Renderer, VirtualFile, write_archive,
    write_tree,
};
pub use error::{Error, IoOp, Result};
