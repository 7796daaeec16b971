//! EPUB 2 markup for the generated control and content files.
//!
//! The manifest builder only knows the [`Renderer`] trait; [`EpubRenderer`]
//! is the stock implementation.

use crate::book::{Document, Section};
use crate::util::{basename, encode_href, escape_xml, guess_media_type};

use super::layout;

/// Produces the text of every generated file in a package.
///
/// Each method receives the whole document. Reading order, which sections
/// appear in the contents, and how front matter is placed are decided here,
/// not by the manifest builder.
pub trait Renderer {
    fn mimetype(&self, _doc: &Document) -> String {
        layout::MIMETYPE_CONTENT.to_string()
    }

    fn container(&self, doc: &Document) -> String;

    /// The OPF package document.
    fn package(&self, doc: &Document, identifier: &str) -> String;

    /// The NCX navigation document.
    fn navigation(&self, doc: &Document, identifier: &str) -> String;

    fn cover(&self, doc: &Document) -> String;

    fn stylesheet(&self, doc: &Document) -> String;

    /// Content file for the section at 1-based `index`.
    fn section(&self, doc: &Document, index: usize) -> String;

    /// The contents page, only requested when the document shows one.
    fn contents(&self, doc: &Document) -> String;
}

/// Default renderer producing EPUB 2.0.1 markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubRenderer;

/// One entry in reading order. Sections carry their 1-based index.
enum ReadingItem<'a> {
    Section(usize, &'a Section),
    Contents,
}

/// Reading order after the cover: front matter, the contents page (if
/// shown), then everything else. Insertion order is kept within each group.
fn reading_order(doc: &Document) -> Vec<ReadingItem<'_>> {
    let indexed = || doc.sections().iter().enumerate().map(|(i, s)| (i + 1, s));
    let mut items: Vec<_> = indexed()
        .filter(|(_, s)| s.is_front_matter)
        .map(|(i, s)| ReadingItem::Section(i, s))
        .collect();
    if doc.show_contents() {
        items.push(ReadingItem::Contents);
    }
    items.extend(
        indexed()
            .filter(|(_, s)| !s.is_front_matter)
            .map(|(i, s)| ReadingItem::Section(i, s)),
    );
    items
}

/// Manifest id of the section at 1-based `index`. File names are free-form,
/// so ids never derive from them.
fn section_id(index: usize) -> String {
    format!("section-{index}")
}

fn section_href(section: &Section) -> String {
    format!("{}/{}", layout::CONTENT_DIR, section.filename)
}

fn contents_href() -> String {
    format!("{}/{}", layout::CONTENT_DIR, layout::CONTENTS_FILE)
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPF/ebook.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const XHTML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
"#;

impl Renderer for EpubRenderer {
    fn container(&self, _doc: &Document) -> String {
        CONTAINER_XML.to_string()
    }

    fn package(&self, doc: &Document, identifier: &str) -> String {
        let meta = doc.metadata();
        let mut opf = String::new();

        opf.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
        );

        opf.push_str(&format!(
            "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
            escape_xml(identifier)
        ));
        opf.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            escape_xml(&meta.title)
        ));
        opf.push_str(&format!(
            "    <dc:creator opf:role=\"aut\" opf:file-as=\"{}\">{}</dc:creator>\n",
            escape_xml(meta.author_sort()),
            escape_xml(&meta.author)
        ));
        opf.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            escape_xml(&meta.language)
        ));

        let optional = [
            ("dc:publisher", &meta.publisher),
            ("dc:description", &meta.description),
            ("dc:date", &meta.published),
            ("dc:rights", &meta.copyright),
            ("dc:source", &meta.source),
            ("dc:subject", &meta.genre),
        ];
        for (tag, value) in optional {
            if let Some(value) = value {
                opf.push_str(&format!("    <{tag}>{}</{tag}>\n", escape_xml(value)));
            }
        }
        for tag in &meta.tags {
            opf.push_str(&format!(
                "    <dc:subject>{}</dc:subject>\n",
                escape_xml(tag)
            ));
        }

        if let Some(ref series) = meta.series {
            opf.push_str(&format!(
                "    <meta name=\"calibre:series\" content=\"{}\"/>\n",
                escape_xml(series)
            ));
            if let Some(sequence) = meta.sequence {
                opf.push_str(&format!(
                    "    <meta name=\"calibre:series_index\" content=\"{sequence}\"/>\n"
                ));
            }
        }
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");

        opf.push_str("  </metadata>\n  <manifest>\n");

        let mut push_item = |id: &str, href: &str| {
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
                escape_xml(id),
                escape_xml(&encode_href(href)),
                guess_media_type(href)
            ));
        };

        push_item("ncx", layout::NAVIGATION_FILE);
        push_item("cover", layout::COVER_FILE);
        push_item(
            "css",
            &format!("{}/{}", layout::CSS_DIR, layout::STYLESHEET_FILE),
        );
        push_item(
            "cover-image",
            &format!("{}/{}", layout::IMAGES_DIR, basename(doc.cover())),
        );
        for (i, image) in doc.images().iter().enumerate() {
            push_item(
                &format!("image-{}", i + 1),
                &format!("{}/{}", layout::IMAGES_DIR, basename(image)),
            );
        }
        for (i, font) in doc.fonts().iter().enumerate() {
            push_item(
                &format!("font-{}", i + 1),
                &format!("{}/{}", layout::FONTS_DIR, basename(font)),
            );
        }
        for (i, section) in doc.sections().iter().enumerate() {
            push_item(&section_id(i + 1), &section_href(section));
        }
        if doc.show_contents() {
            push_item("toc", &contents_href());
        }

        opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
        opf.push_str("    <itemref idref=\"cover\" linear=\"no\"/>\n");
        for item in reading_order(doc) {
            let idref = match item {
                ReadingItem::Section(index, _) => section_id(index),
                ReadingItem::Contents => "toc".to_string(),
            };
            opf.push_str(&format!("    <itemref idref=\"{idref}\"/>\n"));
        }
        opf.push_str("  </spine>\n  <guide>\n");

        opf.push_str(&format!(
            "    <reference type=\"cover\" title=\"Cover\" href=\"{}\"/>\n",
            layout::COVER_FILE
        ));
        if doc.show_contents() {
            opf.push_str(&format!(
                "    <reference type=\"toc\" title=\"{}\" href=\"{}\"/>\n",
                escape_xml(&meta.contents_title),
                contents_href()
            ));
        }
        if let Some(first) = doc.sections().iter().find(|s| !s.is_front_matter) {
            opf.push_str(&format!(
                "    <reference type=\"text\" title=\"{}\" href=\"{}\"/>\n",
                escape_xml(&first.title),
                escape_xml(&encode_href(&section_href(first)))
            ));
        }

        opf.push_str("  </guide>\n</package>\n");
        opf
    }

    fn navigation(&self, doc: &Document, identifier: &str) -> String {
        let meta = doc.metadata();
        let mut ncx = String::new();

        ncx.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
        );
        ncx.push_str(&escape_xml(identifier));
        ncx.push_str(
            r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
        );
        ncx.push_str(&escape_xml(&meta.title));
        ncx.push_str("</text>\n  </docTitle>\n  <docAuthor>\n    <text>");
        ncx.push_str(&escape_xml(&meta.author));
        ncx.push_str("</text>\n  </docAuthor>\n  <navMap>\n");

        let mut play_order = 1;
        for item in reading_order(doc) {
            let (label, href) = match item {
                ReadingItem::Section(_, section) if section.exclude_from_contents => continue,
                ReadingItem::Section(_, section) => (section.title.as_str(), section_href(section)),
                ReadingItem::Contents => (meta.contents_title.as_str(), contents_href()),
            };
            write_nav_point(&mut ncx, label, &href, play_order);
            play_order += 1;
        }

        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }

    fn cover(&self, doc: &Document) -> String {
        let href = format!("{}/{}", layout::IMAGES_DIR, basename(doc.cover()));
        let mut xhtml = String::from(XHTML_HEAD);
        xhtml.push_str(&format!(
            r#"<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}">
<head>
  <title>{title}</title>
  <style type="text/css">
    body {{ margin: 0; padding: 0; text-align: center; }}
    div.cover {{ height: 100%; }}
    img {{ max-width: 100%; max-height: 100%; }}
  </style>
</head>
<body>
  <div class="cover"><img src="{src}" alt="Cover"/></div>
</body>
</html>
"#,
            lang = escape_xml(&doc.metadata().language),
            title = escape_xml(&doc.metadata().title),
            src = escape_xml(&encode_href(&href)),
        ));
        xhtml
    }

    fn stylesheet(&self, doc: &Document) -> String {
        doc.css().to_string()
    }

    fn section(&self, doc: &Document, index: usize) -> String {
        let Some(section) = doc.section(index) else {
            return String::new();
        };
        let mut xhtml = String::from(XHTML_HEAD);
        xhtml.push_str(&format!(
            r#"<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}">
<head>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="../{css_dir}/{css}"/>
</head>
<body>
{content}
</body>
</html>
"#,
            lang = escape_xml(&doc.metadata().language),
            title = escape_xml(&section.title),
            css_dir = layout::CSS_DIR,
            css = layout::STYLESHEET_FILE,
            content = section.content,
        ));
        xhtml
    }

    fn contents(&self, doc: &Document) -> String {
        let title = escape_xml(&doc.metadata().contents_title);
        let mut xhtml = String::from(XHTML_HEAD);
        xhtml.push_str(&format!(
            r#"<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}">
<head>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="../{css_dir}/{css}"/>
</head>
<body>
  <div class="contents">
    <h1>{title}</h1>
"#,
            lang = escape_xml(&doc.metadata().language),
            css_dir = layout::CSS_DIR,
            css = layout::STYLESHEET_FILE,
        ));

        for section in doc
            .sections()
            .iter()
            .filter(|s| !s.exclude_from_contents && !s.is_front_matter)
        {
            xhtml.push_str(&format!(
                "    <p class=\"contents-entry\"><a href=\"{}\">{}</a></p>\n",
                escape_xml(&encode_href(&section.filename)),
                escape_xml(&section.title)
            ));
        }

        xhtml.push_str("  </div>\n</body>\n</html>\n");
        xhtml
    }
}

fn write_nav_point(ncx: &mut String, label: &str, href: &str, play_order: usize) {
    ncx.push_str(&format!(
        "    <navPoint id=\"navpoint-{play_order}\" playOrder=\"{play_order}\">\n"
    ));
    ncx.push_str(&format!(
        "      <navLabel>\n        <text>{}</text>\n      </navLabel>\n",
        escape_xml(label)
    ));
    ncx.push_str(&format!(
        "      <content src=\"{}\"/>\n",
        escape_xml(&encode_href(href))
    ));
    ncx.push_str("    </navPoint>\n");
}
