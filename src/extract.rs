//! Text extraction by file extension.
//!
//! Plain text and markdown are decoded as UTF-8 (lossy). PDFs go through
//! `pdf-extract` and come back as a single string for the whole file.

use std::path::Path;

use thiserror::Error;

/// File kinds the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Markdown,
    Pdf,
}

impl FileKind {
    /// Classifies a path by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(FileKind::Text),
            "md" | "markdown" => Some(FileKind::Markdown),
            "pdf" => Some(FileKind::Pdf),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Extracts UTF-8 text from file contents.
pub fn extract_text(bytes: &[u8], kind: FileKind) -> Result<String, ExtractError> {
    match kind {
        FileKind::Text | FileKind::Markdown => Ok(String::from_utf8_lossy(bytes).into_owned()),
        FileKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
    }
}

/// Classifies `path` and extracts its text.
pub fn extract_file(path: &Path, bytes: &[u8]) -> Result<String, ExtractError> {
    let kind = FileKind::from_path(path)
        .ok_or_else(|| ExtractError::Unsupported(path.display().to_string()))?;
    extract_text(bytes, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(FileKind::from_path(Path::new("a/b.TXT")), Some(FileKind::Text));
        assert_eq!(FileKind::from_path(Path::new("notes.md")), Some(FileKind::Markdown));
        assert_eq!(FileKind::from_path(Path::new("x.pdf")), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_path(Path::new("x.docx")), None);
        assert_eq!(FileKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn text_is_decoded_lossily() {
        let text = extract_text(b"caf\xc3\xa9 \xff", FileKind::Text).unwrap();
        assert!(text.starts_with("café "));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", FileKind::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn unsupported_extension_returns_error() {
        let err = extract_file(Path::new("slides.pptx"), b"zip").unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
    }
}
