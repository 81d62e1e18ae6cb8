//! Document loading for .txt, .pdf and .docx uploads
//!
//! PDFs are read page by page with lopdf so each page keeps its number as
//! the citation section. DOCX text comes from `word/document.xml` inside
//! the zip container.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

use crate::document::types::Document;
use crate::errors::{RagError, Result};

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
    Docx,
}

impl FileKind {
    /// Detect the kind from a file name's extension (case-insensitive)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let extension = extension_of(path.as_ref());
        match extension.as_str() {
            ".txt" => Ok(FileKind::Text),
            ".pdf" => Ok(FileKind::Pdf),
            ".docx" => Ok(FileKind::Docx),
            _ => Err(RagError::UnsupportedFile { extension }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Text => ".txt",
            FileKind::Pdf => ".pdf",
            FileKind::Docx => ".docx",
        }
    }
}

/// Lowercased extension including the dot, or empty
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Check a client-declared MIME type against the file kind
///
/// An absent MIME type is accepted.
pub fn is_mime_allowed(kind: FileKind, mime_type: &str) -> bool {
    if mime_type.is_empty() {
        return true;
    }
    let mime = mime_type.to_lowercase();
    match kind {
        FileKind::Pdf => mime.contains("pdf"),
        FileKind::Text => mime.starts_with("text"),
        FileKind::Docx => {
            mime.contains("word") || mime.contains("officedocument") || mime.contains("openxmlformats")
        }
    }
}

/// Validate an upload's name and MIME type, extension first
pub fn validate_upload(filename: &str, mime_type: &str) -> Result<FileKind> {
    let kind = FileKind::from_path(filename)?;
    if !is_mime_allowed(kind, mime_type) {
        return Err(RagError::InvalidMime {
            mime: mime_type.to_lowercase(),
            extension: kind.extension().to_string(),
        });
    }
    Ok(kind)
}

/// Build a collision-free storage name: `{stem}_{8 hex}{ext}`
pub fn safe_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    let tag = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}{}", stem, &tag[..8], extension_of(path))
}

/// Load a file from disk into one or more documents
pub fn load_document(path: &Path, scope: &str) -> Result<Vec<Document>> {
    let kind = FileKind::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    load_bytes(kind, &bytes, &source, scope)
}

/// Parse in-memory file content
pub fn load_bytes(kind: FileKind, bytes: &[u8], source: &str, scope: &str) -> Result<Vec<Document>> {
    let pages: Vec<(Option<u32>, String)> = match kind {
        FileKind::Text => {
            let text = String::from_utf8(bytes.to_vec()).map_err(|e| RagError::DocumentLoad {
                path: source.to_string(),
                message: format!("file is not valid UTF-8: {}", e),
            })?;
            vec![(None, text)]
        }
        FileKind::Pdf => extract_pdf_pages(bytes, source)?
            .into_iter()
            .map(|(page, text)| (Some(page), text))
            .collect(),
        FileKind::Docx => vec![(None, extract_docx_text(bytes, source)?)],
    };

    let documents: Vec<Document> = pages
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(section, text)| Document {
            text,
            source: source.to_string(),
            scope: scope.to_string(),
            section,
        })
        .collect();

    if documents.is_empty() {
        return Err(RagError::EmptyDocument(
            "No text extracted from document.".to_string(),
        ));
    }

    debug!(source, documents = documents.len(), "loaded document");
    Ok(documents)
}

fn extract_pdf_pages(bytes: &[u8], source: &str) -> Result<Vec<(u32, String)>> {
    let load_err = |message: String| RagError::DocumentLoad {
        path: source.to_string(),
        message,
    };

    let pdf = lopdf::Document::load_mem(bytes).map_err(|e| load_err(e.to_string()))?;

    let mut pages = Vec::new();
    for page_number in pdf.get_pages().keys() {
        let text = pdf
            .extract_text(&[*page_number])
            .map_err(|e| load_err(format!("page {}: {}", page_number, e)))?;
        pages.push((*page_number, text));
    }
    Ok(pages)
}

fn extract_docx_text(bytes: &[u8], source: &str) -> Result<String> {
    let load_err = |message: String| RagError::DocumentLoad {
        path: source.to_string(),
        message,
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| load_err(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| load_err(format!("word/document.xml: {}", e)))?
        .read_to_string(&mut xml)?;

    docx_xml_to_text(&xml).map_err(load_err)
}

/// Flatten WordprocessingML body XML into plain text, one line per paragraph
pub fn docx_xml_to_text(xml: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let unescaped = e.unescape().map_err(|err| err.to_string())?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parsing error: {}", e)),
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_kind_detection() {
        assert_eq!(FileKind::from_path("notes.TXT").unwrap(), FileKind::Text);
        assert_eq!(FileKind::from_path("a/b/report.pdf").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_path("memo.docx").unwrap(), FileKind::Docx);
        assert!(matches!(
            FileKind::from_path("image.png"),
            Err(RagError::UnsupportedFile { .. })
        ));
        assert!(FileKind::from_path("README").is_err());
    }

    #[test]
    fn test_mime_rules() {
        assert!(is_mime_allowed(FileKind::Pdf, ""));
        assert!(is_mime_allowed(FileKind::Pdf, "application/pdf"));
        assert!(!is_mime_allowed(FileKind::Pdf, "text/plain"));
        assert!(is_mime_allowed(FileKind::Text, "TEXT/plain"));
        assert!(!is_mime_allowed(FileKind::Text, "application/octet-stream"));
        assert!(is_mime_allowed(
            FileKind::Docx,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(is_mime_allowed(FileKind::Docx, "application/msword"));
        assert!(!is_mime_allowed(FileKind::Docx, "application/zip"));
    }

    #[test]
    fn test_validate_upload_checks_extension_first() {
        let err = validate_upload("virus.exe", "application/pdf").unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFile { .. }));

        let err = validate_upload("paper.pdf", "image/png").unwrap_err();
        assert_eq!(err.to_string(), "Invalid MIME 'image/png' for extension .pdf.");
    }

    #[test]
    fn test_safe_filename() {
        let name = safe_filename("../../etc/Report.PDF");
        assert!(name.starts_with("Report_"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "Report_".len() + 8 + ".pdf".len());

        assert!(safe_filename("").starts_with("upload_"));
        assert_ne!(safe_filename("a.txt"), safe_filename("a.txt"));
    }

    #[test]
    fn test_load_text_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Rust has ownership.").unwrap();

        let docs = load_document(&path, "team").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "notes.txt");
        assert_eq!(docs[0].scope, "team");
        assert_eq!(docs[0].section, None);
    }

    #[test]
    fn test_blank_text_is_empty_document() {
        let err = load_bytes(FileKind::Text, b"  \n\t ", "blank.txt", "default").unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument(_)));
    }

    #[test]
    fn test_docx_xml_to_text() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve">world &amp; co</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second</w:t><w:br/><w:t>line</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let text = docx_xml_to_text(xml).unwrap();
        assert_eq!(text, "Hello\tworld & co\nSecond\nline\n");
    }

    #[test]
    fn test_load_docx_archive() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer
                .write_all(b"<w:document><w:body><w:p><w:r><w:t>Policy text</w:t></w:r></w:p></w:body></w:document>")
                .unwrap();
            writer.finish().unwrap();
        }

        let docs = load_bytes(FileKind::Docx, buf.get_ref(), "policy.docx", "hr").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text.trim(), "Policy text");
    }

    fn two_page_pdf() -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut pdf = lopdf::Document::with_version("1.5");
        let pages_id = pdf.new_object_id();
        let font_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = pdf.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in ["Ownership rules", "Borrowing rules"] {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        pdf.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        pdf.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        pdf.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_pages_become_sections() {
        let docs = load_bytes(FileKind::Pdf, &two_page_pdf(), "rules.pdf", "rust").unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].section, Some(1));
        assert_eq!(docs[1].section, Some(2));
        assert!(docs[0].text.contains("Ownership rules"));
        assert!(docs[1].text.contains("Borrowing rules"));
        assert!(docs.iter().all(|d| d.source == "rules.pdf" && d.scope == "rust"));
    }

    #[test]
    fn test_corrupt_pdf_is_load_error() {
        let err = load_bytes(FileKind::Pdf, b"not a pdf", "broken.pdf", "default").unwrap_err();
        assert!(matches!(err, RagError::DocumentLoad { .. }));
    }
}
