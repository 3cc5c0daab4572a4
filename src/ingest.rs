//! Plain-text extraction from uploaded documents.
//!
//! The comparison only needs a UTF-8 string per document. This module produces one
//! from a blob and a [`DocumentKind`]:
//!
//! - **Plain text**: the bytes must already be UTF-8
//! - **Word (`.docx`)**: paragraph text from `word/document.xml`, one line per
//!   paragraph, with a run's `w:tab` as a tab and `w:br`/`w:cr` as a line break;
//!   text boxes are left out
//! - **PDF**: not extracted; reported as [`IngestError::Unsupported`]

use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Part of a `.docx` package holding the main document body.
const DOCX_BODY: &str = "word/document.xml";

/// Type tag for an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Picks the kind from a file extension (case-insensitive). Anything that is
    /// not `.docx` or `.pdf` is read as plain text.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("docx") => Self::Docx,
            Some("pdf") => Self::Pdf,
            _ => Self::PlainText,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlainText => "plain text",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid docx package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid docx body: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to read docx body: {0}")]
    Read(#[from] std::io::Error),

    #[error("text extraction from {} documents is not supported", .0.as_str())]
    Unsupported(DocumentKind),
}

/// Extracts UTF-8 text from a document blob.
pub fn extract_text(blob: &[u8], kind: DocumentKind) -> Result<String, IngestError> {
    match kind {
        DocumentKind::PlainText => Ok(String::from_utf8(blob.to_vec())?),
        DocumentKind::Docx => docx_text(blob),
        DocumentKind::Pdf => Err(IngestError::Unsupported(kind)),
    }
}

/// Reads a file and extracts its text, choosing the kind from the extension.
pub fn read_document(path: &Path) -> Result<String, IngestError> {
    let blob = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let kind = DocumentKind::from_path(path);
    log::debug!("Ingesting {} as {}", path.display(), kind.as_str());
    extract_text(&blob, kind)
}

/// Paragraph text of a `.docx` package, paragraphs joined with `\n`.
fn docx_text(blob: &[u8]) -> Result<String, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(blob))?;
    let mut xml = String::new();
    archive.by_name(DOCX_BODY)?.read_to_string(&mut xml)?;
    document_xml_text(&xml)
}

/// Walks a WordprocessingML body and collects the text of each paragraph.
///
/// Tabs and breaks count only inside runs; the `w:tab` elements of a tab-stop
/// definition in `w:pPr` carry no text. Text-box content is skipped.
fn document_xml_text(xml: &str) -> Result<String, IngestError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    // Paragraphs not yet closed, innermost last
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;
    let mut text_box_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        if text_box_depth > 0 {
            match event {
                Event::Start(e) if e.local_name().as_ref() == b"txbxContent" => {
                    text_box_depth += 1;
                }
                Event::End(e) if e.local_name().as_ref() == b"txbxContent" => {
                    text_box_depth -= 1;
                }
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"r" => run_depth += 1,
                b"t" => in_text = true,
                b"txbxContent" => text_box_depth = 1,
                _ => {}
            },
            Event::Empty(e) => match (e.local_name().as_ref(), open.last_mut()) {
                (b"p", _) => paragraphs.push(String::new()),
                (b"tab", Some(current)) if run_depth > 0 => current.push('\t'),
                (b"br" | b"cr", Some(current)) if run_depth > 0 => current.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.extend(open.pop()),
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(e) if in_text => {
                push_text(&mut open, &e.decode().map_err(quick_xml::Error::from)?);
            }
            Event::CData(e) if in_text => {
                push_text(&mut open, &e.decode().map_err(quick_xml::Error::from)?);
            }
            Event::GeneralRef(e) if in_text => {
                if let Some(c) = e.resolve_char_ref()? {
                    push_text(&mut open, c.encode_utf8(&mut [0; 4]));
                } else {
                    let name = e.decode().map_err(quick_xml::Error::from)?;
                    if let Some(value) = quick_xml::escape::resolve_predefined_entity(&name) {
                        push_text(&mut open, value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Appends to the innermost open paragraph.
fn push_text(open: &mut [String], text: &str) {
    if let Some(current) = open.last_mut() {
        current.push_str(text);
    }
}
