use super::{ExtractionError, PageContent};

/// Extract per-page text from a PDF.
///
/// pdf-extract returns the whole document as one string with form feed
/// characters (`\x0C`) between pages; splitting on them recovers the page
/// sequence. Blank pages produce empty strings and are kept, so page
/// numbers form a contiguous 1..=N range matching the source document.
/// Text-layer extraction only — scanned/image PDFs yield empty pages.
pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::PdfError(e.to_string()))?;

    let pages: Vec<PageContent> = if text.contains('\x0C') {
        text.split('\x0C')
            .enumerate()
            .map(|(i, page_text)| PageContent {
                page_number: i + 1,
                text: page_text.trim().to_string(),
            })
            .collect()
    } else {
        // No page breaks found — treat as single page
        vec![PageContent {
            page_number: 1,
            text: text.trim().to_string(),
        }]
    };

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Page splitting operates on the extracted string; exercise it through
    // the same logic extract_pdf applies after pdf-extract returns.
    fn split_pages(text: &str) -> Vec<PageContent> {
        if text.contains('\x0C') {
            text.split('\x0C')
                .enumerate()
                .map(|(i, t)| PageContent {
                    page_number: i + 1,
                    text: t.trim().to_string(),
                })
                .collect()
        } else {
            vec![PageContent {
                page_number: 1,
                text: text.trim().to_string(),
            }]
        }
    }

    #[test]
    fn form_feeds_delimit_pages() {
        let pages = split_pages("page one\x0Cpage two\x0Cpage three");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[2].page_number, 3);
        assert_eq!(pages[1].text, "page two");
    }

    #[test]
    fn blank_pages_keep_numbering_contiguous() {
        let pages = split_pages("intro\x0C   \x0Cconclusion");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].text, "");
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[2].page_number, 3);
    }

    #[test]
    fn no_form_feed_is_single_page() {
        let pages = split_pages("all on one page");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
    }

    #[test]
    fn corrupt_pdf_is_an_error() {
        let err = extract_pdf(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, ExtractionError::PdfError(_)));
    }
}
