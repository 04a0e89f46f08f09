use crate::config::ProcessingConfig;

/// Sliding word-window chunker. Token counts are approximated by
/// whitespace-delimited words, which tracks embedding-model tokenizers
/// closely enough for windowing.
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(config: &ProcessingConfig) -> Self {
        // Overlap must leave the window moving forward.
        let chunk_size = config.chunk_size.max(1);
        let chunk_overlap = config.chunk_overlap.min(chunk_size.saturating_sub(1));

        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split text into overlapping windows, preserving order. Whitespace
    /// inside a window is normalized to single spaces.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        if words.len() <= self.chunk_size {
            return vec![words.join(" ")];
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}
