mod md;
mod pdf;
mod txt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page of extracted text.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-based page number. For TXT/MD, always 1.
    pub page_number: usize,
    /// The extracted text. May be empty for blank or image-only pages;
    /// empty pages are kept so page numbers stay contiguous.
    pub text: String,
}

/// Result of extracting text from a document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Original filename.
    pub filename: String,
    /// File type: "pdf", "txt", "md"
    pub file_type: String,
    /// Extracted pages in source order, numbered 1..=N.
    pub pages: Vec<PageContent>,
}

impl ExtractedDocument {
    /// All text concatenated, without page markers.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Full text with `--- Page N ---` markers, the legacy format stored on
    /// the document row and used as chat context when no page chunks exist.
    pub fn page_marked_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| format!("--- Page {} ---\n{}", p.page_number, p.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Total character count across all pages.
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.len()).sum()
    }
}

/// Extract text from file bytes based on file type.
///
/// Fails as a whole on corrupt or unsupported input; callers must not have
/// written anything before this returns.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    let file_type = ext.as_str();

    let pages = match file_type {
        "pdf" => pdf::extract_pdf(bytes)?,
        "txt" | "text" => txt::extract_txt(bytes)?,
        "md" | "markdown" => md::extract_md(bytes)?,
        other => return Err(ExtractionError::UnsupportedType(other.to_string())),
    };

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        file_type: file_type.to_string(),
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_is_an_error() {
        let err = extract_text(b"GIF89a", "image.gif").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedType(ref t) if t == "gif"));
    }

    #[test]
    fn page_marked_text_format() {
        let doc = ExtractedDocument {
            filename: "a.pdf".to_string(),
            file_type: "pdf".to_string(),
            pages: vec![
                PageContent {
                    page_number: 1,
                    text: "first".to_string(),
                },
                PageContent {
                    page_number: 2,
                    text: String::new(),
                },
                PageContent {
                    page_number: 3,
                    text: "third".to_string(),
                },
            ],
        };
        assert_eq!(
            doc.page_marked_text(),
            "--- Page 1 ---\nfirst\n\n--- Page 2 ---\n\n\n--- Page 3 ---\nthird"
        );
        assert_eq!(doc.total_chars(), 10);
    }

    #[test]
    fn txt_extraction_is_single_page() {
        let doc = extract_text(b"hello world", "notes.txt").unwrap();
        assert_eq!(doc.file_type, "txt");
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].page_number, 1);
        assert_eq!(doc.pages[0].text, "hello world");
    }
}
