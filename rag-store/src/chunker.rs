//! Fixed-size, overlapping text chunking.
//!
//! Offsets and lengths are counted in `char`s, so multi-byte text is never
//! split inside a character.

use services::uuid::chunk_uuid;

use crate::errors::RagError;
use crate::record::Chunk;

/// Chunk size and overlap, both in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkParams {
    /// Rejects parameters for which the window would not advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::InvalidParameter("chunk_size must be > 0".into()));
        }
        if chunk_size <= overlap {
            return Err(RagError::InvalidParameter(format!(
                "chunk_size ({chunk_size}) must be greater than overlap ({overlap})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Distance between the starts of two consecutive chunks.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Number of chunks [`chunk`] produces for a text of `len` characters.
    pub fn expected_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.chunk_size {
            1
        } else {
            (len - self.chunk_size).div_ceil(self.stride()) + 1
        }
    }
}

/// Splits `text` into overlapping windows of `params.chunk_size` characters.
///
/// Windows start at `0, stride, 2*stride, ..` and the walk stops at the first
/// window that reaches the end of the text, so the last chunk may be shorter.
/// Chunk ids are derived from `source`, the offset, the parameters and the chunk text.
pub fn chunk(source: &str, text: &str, params: ChunkParams) -> Result<Vec<Chunk>, RagError> {
    let params = ChunkParams::new(params.chunk_size, params.overlap)?;

    // byte position of every char boundary, including the end
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let mut out = Vec::with_capacity(params.expected_count(len));
    let mut offset = 0usize;
    while offset < len {
        let end = (offset + params.chunk_size).min(len);
        let piece = &text[bounds[offset]..bounds[end]];
        out.push(Chunk {
            id: chunk_uuid(source, offset, params.chunk_size, params.overlap, piece).to_string(),
            source_offset: offset,
            text: piece.to_string(),
            embedding: None,
        });
        if end == len {
            break;
        }
        offset += params.stride();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(c: usize, o: usize) -> ChunkParams {
        ChunkParams::new(c, o).unwrap()
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn splits_with_overlap() {
        let chunks = chunk("plot.txt", "ABCDEFGHIJ", p(4, 1)).unwrap();
        assert_eq!(texts(&chunks), ["ABCD", "DEFG", "GHIJ"]);
        let offsets: Vec<_> = chunks.iter().map(|c| c.source_offset).collect();
        assert_eq!(offsets, [0, 3, 6]);
        assert!(chunks.iter().all(|c| c.embedding.is_none()));
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunk("plot.txt", "", p(500, 100)).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_advancing_parameters() {
        assert!(matches!(ChunkParams::new(0, 0), Err(RagError::InvalidParameter(_))));
        assert!(matches!(ChunkParams::new(4, 4), Err(RagError::InvalidParameter(_))));
        assert!(matches!(ChunkParams::new(4, 9), Err(RagError::InvalidParameter(_))));
        let bad = ChunkParams {
            chunk_size: 3,
            overlap: 3,
        };
        assert!(chunk("s", "abcdef", bad).is_err());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk("s", "ab", p(5, 3)).unwrap();
        assert_eq!(texts(&chunks), ["ab"]);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let chunks = chunk("s", "あいうえおかき", p(3, 1)).unwrap();
        assert_eq!(texts(&chunks), ["あいう", "うえお", "おかき"]);
    }

    #[test]
    fn coverage_overlap_and_count_hold() {
        let text: String = ('a'..='z').cycle().take(137).collect();
        for c in 1..=20 {
            for o in 0..c {
                let params = p(c, o);
                let chunks = chunk("s", &text, params).unwrap();
                let len = text.chars().count();

                let expected = (len - o).div_ceil(c - o);
                assert_eq!(chunks.len(), expected, "c={c} o={o}");
                assert_eq!(chunks.len(), params.expected_count(len));

                assert_eq!(chunks[0].source_offset, 0);
                let last = chunks.last().unwrap();
                assert_eq!(last.source_offset + last.text.chars().count(), len);

                for w in chunks.windows(2) {
                    let prev_end = w[0].source_offset + w[0].text.chars().count();
                    assert_eq!(prev_end - w[1].source_offset, o, "c={c} o={o}");
                    assert_eq!(w[0].text.chars().count(), c);
                }
                for ch in &chunks {
                    let start = ch.source_offset;
                    let n = ch.text.chars().count();
                    let expected: String = text.chars().skip(start).take(n).collect();
                    assert_eq!(ch.text, expected);
                }
            }
        }
    }

    #[test]
    fn ids_are_stable_and_unique() {
        let a = chunk("plot.txt", "ABCDEFGHIJ", p(4, 1)).unwrap();
        let b = chunk("plot.txt", "ABCDEFGHIJ", p(4, 1)).unwrap();
        assert_eq!(a[1].id, b[1].id);
        assert_ne!(a[0].id, a[1].id);
    }
}
