use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use crate::book::Document;
use crate::error::{Error, IoOp, Result};

use super::manifest::Manifest;
use super::markup::{EpubRenderer, Renderer};

/// Configuration for archive output.
#[derive(Debug, Clone, Default)]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
}

impl EpubConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level.min(9));
        self
    }
}

/// Write a manifest into a ZIP container on any [`Write`] + [`Seek`] destination.
///
/// Entries are appended in manifest order, stored or deflated according to
/// their `compress` flag. The container is only finished once every entry
/// has been written; the first error aborts the whole write.
pub fn write_archive<W: Write + Seek>(
    manifest: &Manifest,
    writer: W,
    config: &EpubConfig,
) -> Result<W> {
    let mut zip = ZipWriter::new(writer);

    let compression_level = config.compression_level.unwrap_or(6);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level as i64));

    for file in manifest {
        let options = if file.compress { deflated } else { stored };
        zip.start_file(file.path(), options)?;
        // Manifest entries are always resolved
        zip.write_all(file.content.as_bytes().unwrap_or_default())
            .map_err(ZipError::from)?;
    }

    Ok(zip.finish()?)
}

/// Write every manifest entry as a file below `dir`.
///
/// Writes run concurrently. A failed write aborts the rest; files that
/// were already written are left in place.
pub async fn write_tree(manifest: &Manifest, dir: &Path) -> Result<()> {
    create_dir(dir).await?;

    let writes = manifest.iter().map(|file| async move {
        let folder = if file.folder.is_empty() {
            dir.to_path_buf()
        } else {
            let folder = dir.join(&file.folder);
            create_dir(&folder).await?;
            folder
        };

        let path = folder.join(&file.name);
        tokio::fs::write(&path, file.content.as_bytes().unwrap_or_default())
            .await
            .map_err(|e| Error::io(IoOp::WriteFile, &path, e))?;
        debug!(path = %path.display(), "Wrote file");
        Ok::<_, Error>(())
    });

    try_join_all(writes).await?;
    Ok(())
}

async fn create_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::io(IoOp::CreateDir, dir, e))
}

/// `name` with the `.epub` extension, unless it already has it.
fn archive_name(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".epub") {
        name.to_string()
    } else {
        format!("{name}.epub")
    }
}

impl Document {
    /// Write the document as loose files below `dir`.
    pub async fn write_files(&self, dir: impl AsRef<Path>) -> Result<()> {
        let manifest = self.manifest().await?;
        write_tree(&manifest, dir.as_ref()).await?;
        info!(dir = %dir.as_ref().display(), files = manifest.len(), "Wrote file tree");
        Ok(())
    }

    /// Write the document to `dir/name.epub` and return the file's path.
    pub async fn write_epub(&self, dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
        self.write_epub_with(dir, name, &EpubRenderer, &EpubConfig::default())
            .await
    }

    /// Like [`write_epub`](Self::write_epub) with a custom renderer and
    /// archive settings.
    pub async fn write_epub_with<R: Renderer + ?Sized>(
        &self,
        dir: impl AsRef<Path>,
        name: &str,
        renderer: &R,
        config: &EpubConfig,
    ) -> Result<PathBuf> {
        // Assets are resolved before anything touches the output location
        let manifest = Manifest::build(self, renderer).await?;

        let dir = dir.as_ref();
        create_dir(dir).await?;
        let path = dir.join(archive_name(name));

        let entries = manifest.len();
        let config = config.clone();
        let target = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let file = std::fs::File::create(&target)
                .map_err(|e| Error::io(IoOp::CreateFile, &target, e))?;
            write_archive(&manifest, io::BufWriter::new(file), &config)?
                .flush()
                .map_err(|e| Error::io(IoOp::WriteFile, &target, e))
        });

        match handle.await {
            Ok(result) => result?,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => return Err(Error::io(IoOp::WriteFile, &path, io::Error::other(e))),
        }

        info!(path = %path.display(), entries, "Wrote EPUB");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Metadata;
    use std::io::{Cursor, Read, SeekFrom};
    use zip::ZipArchive;

    /// In-memory sink that refuses writes past `limit` bytes.
    struct FullDisk {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.inner.position() + buf.len() as u64 > self.limit {
                return Err(io::Error::other("no space left on device"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FullDisk {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    async fn manifest(dir: &Path) -> Manifest {
        let cover = dir.join("cover.jpg");
        std::fs::write(&cover, b"\xff\xd8\xff\xe0jpeg").unwrap();
        let mut doc = Document::new(Metadata::new("Title", "Author", &cover)).unwrap();
        doc.add_section("One", "<p>First</p>");
        doc.manifest().await.unwrap()
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name("book"), "book.epub");
        assert_eq!(archive_name("book.EPUB"), "book.EPUB");
        assert_eq!(archive_name("v1.2"), "v1.2.epub");
    }

    #[tokio::test]
    async fn test_write_archive_layout() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(dir.path()).await;

        let cursor = write_archive(&manifest, Cursor::new(Vec::new()), &EpubConfig::new()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(archive.len(), manifest.len());

        for (i, expected) in manifest.iter().enumerate() {
            let mut entry = archive.by_index(i).unwrap();
            assert_eq!(entry.name(), expected.path());
            let method = if expected.compress {
                CompressionMethod::Deflated
            } else {
                CompressionMethod::Stored
            };
            assert_eq!(entry.compression(), method);

            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            assert_eq!(Some(data.as_slice()), expected.content.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_mimetype_bytes_lead_the_archive() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(dir.path()).await;

        let bytes = write_archive(&manifest, Cursor::new(Vec::new()), &EpubConfig::new())
            .unwrap()
            .into_inner();
        // Local file header: signature, method 0 (stored), then name and data
        assert_eq!(&bytes[0..4], b"PK\x03\x04");
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 0);
        let name_len = u16::from_le_bytes([bytes[26], bytes[27]]) as usize;
        let extra_len = u16::from_le_bytes([bytes[28], bytes[29]]) as usize;
        assert_eq!(&bytes[30..30 + name_len], b"mimetype");
        let data = 30 + name_len + extra_len;
        assert_eq!(&bytes[data..data + 20], b"application/epub+zip");
    }

    #[tokio::test]
    async fn test_write_tree() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(dir.path()).await;
        let out = dir.path().join("out");

        write_tree(&manifest, &out).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(out.join("mimetype")).unwrap(),
            "application/epub+zip"
        );
        assert!(out.join("META-INF/container.xml").is_file());
        assert!(out.join("OEBPF/content/s1.xhtml").is_file());
        assert_eq!(
            std::fs::read(out.join("OEBPF/images/cover.jpg")).unwrap(),
            b"\xff\xd8\xff\xe0jpeg"
        );
    }

    #[tokio::test]
    async fn test_write_tree_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(dir.path()).await;
        // A file where the output directory should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();

        match write_tree(&manifest, &blocked).await {
            Err(Error::Io { op, path, .. }) => {
                assert_eq!(op, IoOp::CreateDir);
                assert_eq!(path, blocked);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_archive_propagates_sink_errors() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(dir.path()).await;
        let sink = FullDisk {
            inner: Cursor::new(Vec::new()),
            limit: 100,
        };

        match write_archive(&manifest, sink, &EpubConfig::new()) {
            Err(Error::Archive(_)) => {}
            other => panic!("unexpected result: {:?}", other.map(|s| s.inner.into_inner().len())),
        }
    }

    #[tokio::test]
    async fn test_write_epub_onto_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("cover.jpg");
        std::fs::write(&cover, b"jpeg").unwrap();
        let doc = Document::new(Metadata::new("Title", "Author", &cover)).unwrap();
        // A directory already occupies the archive's path
        let taken = dir.path().join("book.epub");
        std::fs::create_dir(&taken).unwrap();

        match doc.write_epub(dir.path(), "book").await {
            Err(Error::Io { op, path, .. }) => {
                assert_eq!(op, IoOp::CreateFile);
                assert_eq!(path, taken);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_tree_blocked_entry() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(dir.path()).await;
        let out = dir.path().join("out");
        std::fs::create_dir_all(out.join("mimetype")).unwrap();

        match write_tree(&manifest, &out).await {
            Err(Error::Io { op, path, .. }) => {
                assert_eq!(op, IoOp::WriteFile);
                assert_eq!(path, out.join("mimetype"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
