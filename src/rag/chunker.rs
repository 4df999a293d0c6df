use crate::error::{RagError, Result};
use crate::types::Chunk;

/// Splits text into consecutive, non-overlapping chunks of at most
/// `chunk_size` characters.
///
/// Sizes count Unicode scalar values, so a chunk never splits a multi-byte
/// character. Concatenating the chunks in order reproduces the input.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidArgument(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut chars_in_chunk = 0;

        for (offset, _) in text.char_indices() {
            if chars_in_chunk == self.chunk_size {
                chunks.push(Chunk {
                    text: text[start..offset].to_string(),
                    index: chunks.len(),
                });
                start = offset;
                chars_in_chunk = 0;
            }
            chars_in_chunk += 1;
        }

        if start < text.len() {
            chunks.push(Chunk {
                text: text[start..].to_string(),
                index: chunks.len(),
            });
        }

        chunks
    }
}

/// Chunk `text` into pieces of at most `size` characters.
///
/// Fails with [`RagError::InvalidArgument`] when `size` is zero.
pub fn chunk(text: &str, size: usize) -> Result<Vec<Chunk>> {
    Ok(TextChunker::new(size)?.chunk(text))
}
