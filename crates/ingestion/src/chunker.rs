//! Text chunking
//!
//! Splits a paper's full text into overlapping character chunks for
//! embedding.

use citegraph_common::errors::{AppError, Result};
use citegraph_common::models::ChunkRecord;
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Split full text into chunk records for one paper.
///
/// `chunk_size` is the maximum chunk length in characters and
/// `chunk_overlap` the shared span between adjacent chunks. Chunk
/// boundaries prefer sentence and word breaks where possible.
pub fn chunk_text(
    arxiv_id: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<ChunkRecord>> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .map_err(|e| AppError::Configuration {
            message: format!("invalid chunking parameters: {e}"),
        })?;
    let splitter = TextSplitter::new(config);

    let chunks: Vec<ChunkRecord> = splitter
        .chunks(text)
        .enumerate()
        .map(|(seq, chunk)| ChunkRecord {
            arxiv_id: arxiv_id.to_string(),
            seq,
            text: chunk.to_string(),
        })
        .collect();

    debug!(
        arxiv_id,
        input_len = text.len(),
        chunk_count = chunks.len(),
        chunk_size,
        "Text chunked"
    );

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_chunking() {
        let text = "This is a test sentence. ".repeat(100);
        let chunks = chunk_text("2301.00001", &text, 200, 20).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 200);
            assert_eq!(chunk.arxiv_id, "2301.00001");
        }
    }

    #[test]
    fn test_sequence_numbers_are_contiguous() {
        let text = "Lorem ipsum dolor sit amet. ".repeat(50);
        let chunks = chunk_text("2301.00001", &text, 100, 10).unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.seq, i);
        }
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunks = chunk_text("2301.00001", "", 1000, 20).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("2301.00001", "Short abstract only.", 1000, 20).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short abstract only.");
    }

    #[test]
    fn test_overlap_larger_than_size_is_rejected() {
        assert!(chunk_text("2301.00001", "text", 10, 20).is_err());
    }
}
