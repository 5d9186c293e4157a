//! PDF text extraction
//!
//! Extracts text content from downloaded PDF bytes using lopdf.

use citegraph_common::errors::{AppError, Result};
use tracing::{debug, warn};

/// Extract text content from PDF bytes
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| AppError::Parse {
        message: format!("failed to load PDF: {e}"),
    })?;

    let mut text = String::new();
    let pages = doc.get_pages();

    debug!(page_count = pages.len(), "Extracting text from PDF");

    for (page_num, _) in pages.iter() {
        match extract_page_text(&doc, *page_num) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    if text.trim().is_empty() {
        return Err(AppError::Parse {
            message: "no text content extracted from PDF".to_string(),
        });
    }

    let cleaned = clean_text(&text);

    debug!(
        original_len = text.len(),
        cleaned_len = cleaned.len(),
        "Text extraction complete"
    );

    Ok(cleaned)
}

/// Extract text from a single page
fn extract_page_text(doc: &lopdf::Document, page_num: u32) -> std::result::Result<String, String> {
    let page_id = doc
        .page_iter()
        .nth((page_num - 1) as usize)
        .ok_or_else(|| format!("Page {} not found", page_num))?;

    let content = doc.get_page_content(page_id).map_err(|e| e.to_string())?;

    Ok(extract_text_from_content(&content))
}

/// Extract text from a PDF content stream, between BT and ET operators
fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push(' ');
                current_text.clear();
            }
            continue;
        }

        if in_text_block {
            // text showing operators: Tj, TJ, ', "
            if let Some(text_content) = extract_text_from_operator(trimmed) {
                current_text.push_str(&text_content);
            }
        }
    }

    text
}

/// Extract text from a PDF text operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    // (text) Tj operator
    if line.ends_with("Tj") || line.ends_with("'") || line.ends_with("\"") {
        if let Some(start) = line.find('(') {
            if let Some(end) = line.rfind(')') {
                let text = &line[start + 1..end];
                return Some(decode_pdf_string(text));
            }
        }
    }

    // [(text) num (text) num] TJ operator (array of text)
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                '(' => {
                    in_paren = true;
                }
                ')' => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => {
                    current.push(ch);
                }
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('(') => result.push('('),
                Some(')') => result.push(')'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collapse whitespace runs and strip common PDF artifacts
fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let input = "Hello   World\n\nTest";
        assert_eq!(clean_text(input), "Hello World Test");
    }

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string("Hello\\nWorld"), "Hello\nWorld");
        assert_eq!(decode_pdf_string("Test\\(paren\\)"), "Test(paren)");
    }

    #[test]
    fn test_extract_tj_operator() {
        let line = "(see arXiv:2301.12345 for details) Tj";
        assert_eq!(
            extract_text_from_operator(line).as_deref(),
            Some("see arXiv:2301.12345 for details")
        );
    }

    #[test]
    fn test_extract_tj_array_operator() {
        let line = "[(Hel) -20 (lo)] TJ";
        assert_eq!(extract_text_from_operator(line).as_deref(), Some("Hello"));
    }

    #[test]
    fn test_content_stream_extraction() {
        let content = b"BT\n(First part) Tj\nET\nBT\n(second part) Tj\nET\n";
        let text = extract_text_from_content(content);
        assert_eq!(text, "First part second part ");
    }

    #[test]
    fn test_invalid_bytes_fail_to_parse() {
        let err = extract_text(b"not a pdf").unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }
}
