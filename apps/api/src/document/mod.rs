//! Document Text Extractor — converts uploaded resume bytes into plain text.
//!
//! Pure transformation of bytes to string; no I/O beyond library-internal
//! parsing. PDF extraction has no OCR, so image-only PDFs yield empty or
//! near-empty text — that is not an error.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to extract text: {0}")]
    Parse(String),
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Parse(msg) => AppError::Extraction(msg),
        }
    }
}

/// Supported resume file types, derived from the declared file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
}

impl FileType {
    /// Parses a declared extension (case-insensitive, no leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            _ => None,
        }
    }

    /// Extracts the extension from a filename and parses it.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename.rsplit('.').next().and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
        }
    }
}

/// Extracts plain text from resume bytes of the given declared type.
///
/// Fails with `ExtractError::Parse` on malformed input; the underlying parser
/// message is preserved for server-side logging.
pub fn extract_text(bytes: &[u8], file_type: FileType) -> Result<String, ExtractError> {
    match file_type {
        FileType::Pdf => extract_pdf(bytes),
        FileType::Docx => extract_docx(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Parse(e.to_string()))
}

/// DOCX text extraction: reads `word/document.xml` from the archive and
/// concatenates the `w:t` text runs, discarding styling.
///
/// Inclusion rule: body tables ARE included (their runs live in
/// document.xml); headers and footers are NOT (they live in separate parts).
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| ExtractError::Parse(format!("not a valid DOCX archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Parse(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Parse(format!("failed to read document.xml: {e}")))?;

    parse_document_xml(&xml)
}

/// SAX-style pass over document.xml: text inside `w:t` is kept, `w:p` ends
/// become newlines, `w:tab` becomes a tab.
fn parse_document_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut out = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::with_capacity(1024);

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::Parse(format!("invalid XML text: {e}")))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Parse(format!("malformed document.xml: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
