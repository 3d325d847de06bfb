//! Plain-text extraction from uploaded documents (.txt, .pdf, .docx).

use regex::{Captures, Regex};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}. Supported: .txt, .pdf, .docx")]
    Unsupported(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("Failed to parse DOCX: {0}")]
    Docx(String),

    #[error("No text found in document")]
    Empty,
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Document formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Detect the document kind from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "txt" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "" => Err(ExtractError::Unsupported("(no extension)".to_string())),
            other => Err(ExtractError::Unsupported(format!(".{}", other))),
        }
    }
}

/// Read a document from disk and return its plain text
pub fn extract_file(path: &Path) -> Result<String> {
    let kind = DocumentKind::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;

    log::debug!("extracting {:?} from {} ({} bytes)", kind, path.display(), bytes.len());
    extract_bytes(kind, &bytes)
}

/// Extract plain text from an in-memory document
pub fn extract_bytes(kind: DocumentKind, bytes: &[u8]) -> Result<String> {
    let text = match kind {
        DocumentKind::Text => decode_text(bytes),
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::Pdf(e.to_string()))?,
        DocumentKind::Docx => extract_docx(bytes)?,
    };

    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    Ok(text)
}

/// Decode UTF-8 text, dropping a byte-order mark and replacing invalid sequences
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("text file is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(format!("word/document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    Ok(document_xml_to_text(&xml))
}

fn docx_token_regex() -> &'static Regex {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    TOKENS.get_or_init(|| {
        Regex::new(concat!(
            r"(?s)<w:[tp](?:\s[^>]*)?/>",
            r"|<w:t(?:\s[^>]*[^>/])?>(.*?)</w:t>",
            r"|<w:tab\s*/>|<w:(?:br|cr)\b[^>]*/>|</w:p>",
        ))
        .expect("docx token pattern is valid")
    })
}

fn entity_regex() -> &'static Regex {
    static ENTITIES: OnceLock<Regex> = OnceLock::new();
    ENTITIES.get_or_init(|| {
        Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|lt|gt|amp|quot|apos);")
            .expect("entity pattern is valid")
    })
}

/// Flatten WordprocessingML body text: runs are concatenated, paragraphs and
/// breaks become newlines, tabs stay tabs. Empty `<w:p/>` paragraphs still
/// count as a line.
fn document_xml_to_text(xml: &str) -> String {
    let mut text = String::new();

    for caps in docx_token_regex().captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            text.push_str(&decode_entities(run.as_str()));
            continue;
        }

        let token = &caps[0];
        if token.starts_with("<w:tab") {
            text.push('\t');
        } else if token.starts_with("<w:t") {
            // empty self-closing run
        } else {
            text.push('\n');
        }
    }

    text.trim_end_matches('\n').to_string()
}

fn decode_entities(s: &str) -> String {
    entity_regex()
        .replace_all(s, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .unwrap_or_else(|| entity[1..].parse())
                    .ok()
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
