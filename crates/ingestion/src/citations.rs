//! Citation extraction
//!
//! Scans a paper's full text for explicit "arXiv:NNNN.NNNNN" markers.
//! Citations given as DOIs, bare titles or bibliography entries
//! without an arXiv id are not detected.

use regex_lite::Regex;

use crate::source::strip_version;

const CITATION_PATTERN: &str = r"arXiv:(\d{4}\.\d{4,5})";

/// Extract cited arXiv ids from full text.
///
/// The result is deduplicated, keeps first-occurrence order, and never
/// contains `own_id` itself regardless of version suffixes.
pub fn extract_citations(text: &str, own_id: &str) -> Vec<String> {
    let re = match Regex::new(CITATION_PATTERN) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let own_base = strip_version(own_id);

    let mut seen = std::collections::HashSet::new();
    let mut cited = Vec::new();
    for capture in re.captures_iter(text) {
        if let Some(id) = capture.get(1) {
            let id = id.as_str().to_string();
            if id != own_base && seen.insert(id.clone()) {
                cited.push(id);
            }
        }
    }
    cited
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_and_dedupes_in_order() {
        let text = "As shown in arXiv:2301.12345 and arXiv:1706.03762, \
                    later confirmed by arXiv:2301.12345.";
        let cited = extract_citations(text, "2401.00001");
        assert_eq!(cited, vec!["2301.12345", "1706.03762"]);
    }

    #[test]
    fn test_excludes_own_id() {
        let text = "This paper (arXiv:2301.12345) builds on arXiv:1706.03762.";
        let cited = extract_citations(text, "2301.12345");
        assert_eq!(cited, vec!["1706.03762"]);
    }

    #[test]
    fn test_excludes_own_id_with_version_suffix() {
        let text = "See arXiv:2301.12345 for the original.";
        let cited = extract_citations(text, "2301.12345v3");
        assert!(cited.is_empty());
    }

    #[test]
    fn test_four_digit_numbers_accepted() {
        let text = "Compare arXiv:0704.0001 with newer work.";
        assert_eq!(extract_citations(text, "x"), vec!["0704.0001"]);
    }

    #[test]
    fn test_ignores_non_matching_markers() {
        let text = "See doi:10.1000/xyz and [Smith 2019] and arXiv:abcd.12345.";
        assert!(extract_citations(text, "x").is_empty());
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_citations("", "2301.12345").is_empty());
    }
}
