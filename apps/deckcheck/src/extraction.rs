//! PDF text extraction and page splitting.
//!
//! Page boundaries are approximate: the full extracted text is divided evenly
//! by the reported page count. Slide boundaries are not guaranteed to line up
//! with the page texts produced here.

use anyhow::{anyhow, Context, Result};

use crate::models::deck::NewPage;

/// Raw output of a PDF text extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

/// Turns PDF bytes into text plus a page count. Implementations are blocking.
pub trait PdfTextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText>;
}

/// `pdf-extract` for text, `lopdf` for the page count.
pub struct PdfExtractor;

impl PdfTextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        let document =
            lopdf::Document::load_mem(bytes).context("Failed to parse PDF document")?;
        let page_count = document.get_pages().len();

        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| anyhow!("PDF text extraction failed: {e}"))?;

        Ok(ExtractedText { text, page_count })
    }
}

/// Splits extracted text into `page_count` even character slices, numbered from 1.
pub fn split_pages(extracted: &ExtractedText) -> Result<Vec<NewPage>> {
    if extracted.page_count == 0 {
        return Err(anyhow!("PDF contains no pages"));
    }

    let chars: Vec<char> = extracted.text.chars().collect();
    let per_page = chars.len().div_ceil(extracted.page_count);

    let pages = (0..extracted.page_count)
        .map(|index| {
            let start = (index * per_page).min(chars.len());
            let end = ((index + 1) * per_page).min(chars.len());
            let slice: String = chars[start..end].iter().collect();
            let page_number = index as i32 + 1;

            let trimmed = slice.trim();
            let text = if trimmed.is_empty() {
                format!("[Page {page_number} - No text extracted]")
            } else {
                trimmed.to_string()
            };

            NewPage {
                page_number,
                word_count: word_count(&text) as i32,
                text,
            }
        })
        .collect();

    Ok(pages)
}

/// Whitespace-delimited, non-empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(text: &str, page_count: usize) -> ExtractedText {
        ExtractedText {
            text: text.to_string(),
            page_count,
        }
    }

    #[test]
    fn test_word_count_ignores_repeated_whitespace() {
        assert_eq!(word_count("alpha  beta   "), 2);
        assert_eq!(word_count("   "), 0);
        assert_eq!(word_count("one\ttwo\nthree"), 3);
    }

    #[test]
    fn test_split_even_halves() {
        let pages = split_pages(&extracted("PageOneText\nPageTwoText\n", 2)).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].text, "PageOneText");
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[1].text, "PageTwoText");
        assert_eq!(pages[0].word_count, 1);
    }

    #[test]
    fn test_split_uses_placeholder_for_empty_slices() {
        let pages = split_pages(&extracted("abc", 3)).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].text, "a");

        let pages = split_pages(&extracted("ab", 4)).unwrap();
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[2].text, "[Page 3 - No text extracted]");
        assert_eq!(pages[3].text, "[Page 4 - No text extracted]");
        assert_eq!(pages[3].word_count, 6);
    }

    #[test]
    fn test_split_whitespace_only_slice_gets_placeholder() {
        let pages = split_pages(&extracted("Intro     ", 2)).unwrap();
        assert_eq!(pages[0].text, "Intro");
        assert_eq!(pages[1].text, "[Page 2 - No text extracted]");
    }

    #[test]
    fn test_split_handles_multibyte_characters() {
        let pages = split_pages(&extracted("€€€€", 2)).unwrap();
        assert_eq!(pages[0].text, "€€");
        assert_eq!(pages[1].text, "€€");
    }

    #[test]
    fn test_split_rejects_zero_pages() {
        assert!(split_pages(&extracted("text", 0)).is_err());
    }
}
