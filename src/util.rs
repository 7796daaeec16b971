//! Small helpers shared by the renderer and the manifest builder.

use std::borrow::Cow;
use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in hrefs. Path separators and dots stay literal.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Escape text for use in XML character data or attribute values.
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

/// Percent-encode a relative href.
pub fn encode_href(href: &str) -> Cow<'_, str> {
    utf8_percent_encode(href, HREF).into()
}

/// File name component of an asset path; directories are discarded.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Guess a media type from a file name's extension.
pub fn guess_media_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xhtml" | "html" | "htm" => "application/xhtml+xml",
        "css" => "text/css",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ttf" => "application/x-font-ttf",
        "otf" => "application/vnd.ms-opentype",
        "woff" => "application/font-woff",
        "woff2" => "font/woff2",
        "ncx" => "application/x-dtbncx+xml",
        "opf" => "application/oebps-package+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_xml("\"quoted\""), "&quot;quoted&quot;");
        assert!(matches!(escape_xml("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_encode_href() {
        assert_eq!(encode_href("../images/my cover.png"), "../images/my%20cover.png");
        assert_eq!(encode_href("s1.xhtml"), "s1.xhtml");
    }

    #[test]
    fn test_basename_discards_directories() {
        assert_eq!(basename(&PathBuf::from("/tmp/assets/cover.jpg")), "cover.jpg");
        assert_eq!(basename(&PathBuf::from("font.ttf")), "font.ttf");
    }

    #[test]
    fn test_guess_media_type() {
        assert_eq!(guess_media_type("cover.JPG"), "image/jpeg");
        assert_eq!(guess_media_type("s1.xhtml"), "application/xhtml+xml");
        assert_eq!(guess_media_type("noext"), "application/octet-stream");
    }
}
