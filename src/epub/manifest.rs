//! The ordered list of files that make up a package.
//!
//! Building happens in two phases. [`Manifest::render_files`] walks the
//! document synchronously and produces every entry, leaving fonts and images
//! as [`FileContent::Pending`] paths. [`Manifest::build`] then reads all
//! pending assets concurrently and fails as a whole if any one of them fails.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::book::Document;
use crate::error::{Error, Result};
use crate::util::basename;

use super::layout;
use super::markup::{EpubRenderer, Renderer};

/// Content of a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
    /// An asset on disk, read during resolution.
    Pending(PathBuf),
}

impl FileContent {
    /// The bytes to write, or `None` for unresolved content.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FileContent::Text(text) => Some(text.as_bytes()),
            FileContent::Binary(data) => Some(data),
            FileContent::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FileContent::Pending(_))
    }
}

/// A single file to be written into the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    /// File name without any directory component.
    pub name: String,
    /// Destination folder; empty for the archive root.
    pub folder: String,
    pub compress: bool,
    pub content: FileContent,
}

impl VirtualFile {
    fn text(folder: impl Into<String>, name: impl Into<String>, content: String) -> Self {
        Self {
            name: name.into(),
            folder: folder.into(),
            compress: true,
            content: FileContent::Text(content),
        }
    }

    fn pending(folder: impl Into<String>, path: &Path) -> Self {
        Self {
            name: basename(path),
            folder: folder.into(),
            compress: true,
            content: FileContent::Pending(path.to_path_buf()),
        }
    }

    /// Path inside the package: `folder/name`, or `name` at the root.
    pub fn path(&self) -> String {
        if self.folder.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.folder, self.name)
        }
    }
}

/// Every file of a package, in archive order, with all content resolved.
///
/// The first entry is always the stored `mimetype` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    files: Vec<VirtualFile>,
}

impl Manifest {
    /// Render and resolve the manifest for `doc`.
    pub async fn build<R: Renderer + ?Sized>(doc: &Document, renderer: &R) -> Result<Self> {
        let files = Self::render_files(doc, renderer)?;
        let files = resolve(files).await?;
        info!(
            title = %doc.metadata().title,
            entries = files.len(),
            "Built manifest"
        );
        Ok(Self { files })
    }

    /// Render phase: every entry in archive order, assets still pending.
    pub fn render_files<R: Renderer + ?Sized>(
        doc: &Document,
        renderer: &R,
    ) -> Result<Vec<VirtualFile>> {
        check_names(doc)?;

        let identifier = doc.metadata().identifier();
        let package_dir = layout::PACKAGE_DIR;
        let content_dir = layout::package_folder(layout::CONTENT_DIR);
        let mut files = Vec::with_capacity(8 + doc.section_count() + doc.fonts().len());

        // 1. Control files; mimetype must be first and stored
        files.push(VirtualFile {
            compress: false,
            ..VirtualFile::text("", layout::MIMETYPE_FILE, renderer.mimetype(doc))
        });
        files.push(VirtualFile::text(
            layout::META_INF_DIR,
            layout::CONTAINER_FILE,
            renderer.container(doc),
        ));
        files.push(VirtualFile::text(
            package_dir,
            layout::PACKAGE_FILE,
            renderer.package(doc, &identifier),
        ));
        files.push(VirtualFile::text(
            package_dir,
            layout::NAVIGATION_FILE,
            renderer.navigation(doc, &identifier),
        ));
        files.push(VirtualFile::text(
            package_dir,
            layout::COVER_FILE,
            renderer.cover(doc),
        ));

        // 2. Stylesheet, even when empty
        files.push(VirtualFile::text(
            layout::package_folder(layout::CSS_DIR),
            layout::STYLESHEET_FILE,
            renderer.stylesheet(doc),
        ));

        // 3. Sections
        for (i, section) in doc.sections().iter().enumerate() {
            files.push(VirtualFile::text(
                content_dir.as_str(),
                section.filename.as_str(),
                renderer.section(doc, i + 1),
            ));
        }

        // 4. Contents page
        if doc.show_contents() {
            files.push(VirtualFile::text(
                content_dir.as_str(),
                layout::CONTENTS_FILE,
                renderer.contents(doc),
            ));
        }

        // 5-6. Assets
        let fonts_dir = layout::package_folder(layout::FONTS_DIR);
        for font in doc.fonts() {
            files.push(VirtualFile::pending(fonts_dir.as_str(), font));
        }
        let images_dir = layout::package_folder(layout::IMAGES_DIR);
        files.push(VirtualFile::pending(images_dir.as_str(), doc.cover()));
        for image in doc.images() {
            files.push(VirtualFile::pending(images_dir.as_str(), image));
        }

        debug!(entries = files.len(), "Rendered manifest entries");
        Ok(files)
    }

    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VirtualFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Find an entry by its package path.
    pub fn get(&self, path: &str) -> Option<&VirtualFile> {
        self.files.iter().find(|f| f.path() == path)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a VirtualFile;
    type IntoIter = std::slice::Iter<'a, VirtualFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

impl Document {
    /// Build the manifest with the stock [`EpubRenderer`].
    pub async fn manifest(&self) -> Result<Manifest> {
        Manifest::build(self, &EpubRenderer).await
    }
}

/// Resolution phase: read every pending asset concurrently.
///
/// Resolved entries keep their relative order and stay behind all
/// entries that were already inline.
async fn resolve(files: Vec<VirtualFile>) -> Result<Vec<VirtualFile>> {
    let (mut resolved, pending): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|f| !f.content.is_pending());

    let loads = pending.into_iter().map(|mut file| async move {
        if let FileContent::Pending(path) = &file.content {
            let data = tokio::fs::read(path).await.map_err(|source| Error::AssetLoad {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), bytes = data.len(), "Loaded asset");
            file.content = FileContent::Binary(data);
        }
        Ok::<_, Error>(file)
    });

    resolved.extend(try_join_all(loads).await?);
    Ok(resolved)
}

/// Reject names that would overwrite each other inside the package.
fn check_names(doc: &Document) -> Result<()> {
    let mut sections = HashSet::new();
    if doc.show_contents() {
        sections.insert(layout::CONTENTS_FILE.to_string());
    }
    for section in doc.sections() {
        if !is_plain_file_name(&section.filename) {
            return Err(Error::InvalidFilename(section.filename.clone()));
        }
        if !sections.insert(section.filename.clone()) {
            return Err(Error::DuplicateFilename(section.filename.clone()));
        }
    }

    let mut fonts = HashSet::new();
    for font in doc.fonts() {
        let name = basename(font);
        if !fonts.insert(name.clone()) {
            return Err(Error::DuplicateAsset(format!("{}/{name}", layout::FONTS_DIR)));
        }
    }

    let mut images = HashSet::new();
    for image in std::iter::once(doc.cover()).chain(doc.images().iter().map(PathBuf::as_path)) {
        let name = basename(image);
        if !images.insert(name.clone()) {
            return Err(Error::DuplicateAsset(format!("{}/{name}", layout::IMAGES_DIR)));
        }
    }

    Ok(())
}

/// A name with no directory component that stays inside its folder.
fn is_plain_file_name(name: &str) -> bool {
    !name.contains(['/', '\\'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Metadata, SectionOptions};

    fn document(cover: &Path) -> Document {
        Document::new(Metadata::new("Title", "Author", cover)).unwrap()
    }

    fn layout_of(files: &[VirtualFile]) -> Vec<(String, bool)> {
        files.iter().map(|f| (f.path(), f.compress)).collect()
    }

    #[test]
    fn test_render_order() {
        let mut doc = document(Path::new("/art/cover.png"));
        doc.add_section("One", "<p>1</p>");
        doc.add_section("Two", "<p>2</p>");
        doc.add_font("/fonts/a.ttf");
        doc.add_image("/art/map.png");

        let files = Manifest::render_files(&doc, &EpubRenderer).unwrap();
        let expected = [
            ("mimetype", false),
            ("META-INF/container.xml", true),
            ("OEBPF/ebook.opf", true),
            ("OEBPF/navigation.ncx", true),
            ("OEBPF/cover.xhtml", true),
            ("OEBPF/css/ebook.css", true),
            ("OEBPF/content/s1.xhtml", true),
            ("OEBPF/content/s2.xhtml", true),
            ("OEBPF/content/toc.xhtml", true),
            ("OEBPF/fonts/a.ttf", true),
            ("OEBPF/images/cover.png", true),
            ("OEBPF/images/map.png", true),
        ];
        let expected: Vec<_> = expected.iter().map(|(p, c)| (p.to_string(), *c)).collect();
        assert_eq!(layout_of(&files), expected);
        assert_eq!(
            files[0].content,
            FileContent::Text("application/epub+zip".to_string())
        );
        assert!(files[9..].iter().all(|f| f.content.is_pending()));
    }

    #[test]
    fn test_render_without_contents() {
        let mut doc = document(Path::new("cover.png"));
        doc.set_show_contents(false);
        let files = Manifest::render_files(&doc, &EpubRenderer).unwrap();
        assert_eq!(files.len(), 7);
        assert!(files.iter().all(|f| f.name != "toc.xhtml"));
    }

    #[test]
    fn test_empty_stylesheet_is_emitted() {
        let doc = document(Path::new("cover.png"));
        let files = Manifest::render_files(&doc, &EpubRenderer).unwrap();
        let css = files.iter().find(|f| f.name == "ebook.css").unwrap();
        assert_eq!(css.content, FileContent::Text(String::new()));
    }

    #[test]
    fn test_duplicate_section_filename() {
        let mut doc = document(Path::new("cover.png"));
        doc.add_section_with("A", "", SectionOptions::new().with_filename("s2"));
        doc.add_section("B", "");
        match Manifest::render_files(&doc, &EpubRenderer) {
            Err(Error::DuplicateFilename(name)) => assert_eq!(name, "s2.xhtml"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_section_named_like_contents_page() {
        let mut doc = document(Path::new("cover.png"));
        doc.add_section_with("A", "", SectionOptions::new().with_filename("toc"));
        assert!(matches!(
            Manifest::render_files(&doc, &EpubRenderer),
            Err(Error::DuplicateFilename(_))
        ));

        doc.set_show_contents(false);
        assert!(Manifest::render_files(&doc, &EpubRenderer).is_ok());
    }

    #[test]
    fn test_filename_with_directory_is_rejected() {
        for name in ["../../../escaped", "part1/ch1", "part1\\ch1", "/abs"] {
            let mut doc = document(Path::new("cover.png"));
            doc.add_section_with("Evil", "", SectionOptions::new().with_filename(name));
            assert!(
                matches!(
                    Manifest::render_files(&doc, &EpubRenderer),
                    Err(Error::InvalidFilename(_))
                ),
                "{name} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_escaping_filename_writes_nothing_outside() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("cover.png");
        std::fs::write(&cover, b"png").unwrap();
        let out = dir.path().join("deep").join("out");

        let mut doc = document(&cover);
        doc.add_section_with("Evil", "", SectionOptions::new().with_filename("../../../escaped"));

        assert!(matches!(
            doc.write_files(&out).await,
            Err(Error::InvalidFilename(name)) if name == "../../../escaped.xhtml"
        ));
        assert!(!dir.path().join("escaped.xhtml").exists());
        assert!(!out.exists());
    }

    #[test]
    fn test_duplicate_asset_basename() {
        let mut doc = document(Path::new("/a/cover.png"));
        doc.add_image("/b/cover.png");
        assert!(matches!(
            Manifest::render_files(&doc, &EpubRenderer),
            Err(Error::DuplicateAsset(name)) if name == "images/cover.png"
        ));
    }

    #[tokio::test]
    async fn test_resolve_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("cover.png");
        let font = dir.path().join("serif.otf");
        std::fs::write(&cover, b"png").unwrap();
        std::fs::write(&font, b"otf").unwrap();

        let mut doc = document(&cover);
        doc.add_font(&font);
        doc.add_section("One", "");

        let manifest = doc.manifest().await.unwrap();
        assert!(manifest.iter().all(|f| !f.content.is_pending()));
        let tail: Vec<_> = manifest.iter().skip(manifest.len() - 2).collect();
        assert_eq!(tail[0].path(), "OEBPF/fonts/serif.otf");
        assert_eq!(tail[0].content.as_bytes(), Some(&b"otf"[..]));
        assert_eq!(tail[1].path(), "OEBPF/images/cover.png");
        assert_eq!(tail[1].content.as_bytes(), Some(&b"png"[..]));
        assert!(manifest.get("OEBPF/content/s1.xhtml").is_some());
    }

    #[tokio::test]
    async fn test_missing_asset_fails_whole_build() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("cover.png");
        std::fs::write(&cover, b"png").unwrap();

        let mut doc = document(&cover);
        let missing = dir.path().join("missing.ttf");
        doc.add_font(&missing);

        match doc.manifest().await {
            Err(Error::AssetLoad { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
