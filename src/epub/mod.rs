//! EPUB packaging: markup, manifest and writers.

mod manifest;
mod markup;
mod writer;

pub use manifest::{FileContent, Manifest, VirtualFile};
pub use markup::{EpubRenderer, Renderer};
pub use writer::{EpubConfig, write_archive, write_tree};

/// Fixed locations of files inside a package.
///
/// `*_DIR` constants under the package directory are relative to it, which
/// is also how the package document and content files refer to them.
pub mod layout {
    pub const MIMETYPE_FILE: &str = "mimetype";
    pub const MIMETYPE_CONTENT: &str = "application/epub+zip";

    pub const META_INF_DIR: &str = "META-INF";
    pub const CONTAINER_FILE: &str = "container.xml";

    pub const PACKAGE_DIR: &str = "OEBPF";
    pub const PACKAGE_FILE: &str = "ebook.opf";
    pub const NAVIGATION_FILE: &str = "navigation.ncx";
    pub const COVER_FILE: &str = "cover.xhtml";

    pub const CSS_DIR: &str = "css";
    pub const STYLESHEET_FILE: &str = "ebook.css";
    pub const CONTENT_DIR: &str = "content";
    pub const CONTENTS_FILE: &str = "toc.xhtml";
    pub const FONTS_DIR: &str = "fonts";
    pub const IMAGES_DIR: &str = "images";

    /// Folder of a package subdirectory as seen from the archive root.
    pub fn package_folder(dir: &str) -> String {
        format!("{PACKAGE_DIR}/{dir}")
    }
}
