//! Bounded overlapping chunking with boundary preference.
//!
//! Splits long text at paragraph boundaries first, then lines, then words,
//! and only hard-cuts characters when a single word exceeds the budget.
//! Adjacent chunks share an overlap tail so context is not lost at cut
//! points.

use crate::config::ChunkingConfig;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

pub struct Chunker {
    cfg: ChunkingConfig,
}

impl Chunker {
    pub fn new(cfg: ChunkingConfig) -> Self {
        Self { cfg }
    }

    /// Cut `text` into chunks of at most `chunk_size` fresh characters
    /// each, plus an overlap seed of at least `chunk_overlap` characters
    /// (extended back to the previous word boundary) carried over from the
    /// previous chunk. Chunks shorter than `min_fragment_len` after
    /// trimming are dropped.
    pub fn split(&self, text: &str) -> Vec<String> {
        let pieces = self.atomize(text, &SEPARATORS);
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut fresh = 0usize; // chars in `current` excluding the overlap seed
        for piece in pieces {
            let piece_len = piece.chars().count();
            if fresh > 0 && fresh + piece_len > self.cfg.chunk_size {
                self.push_chunk(&mut chunks, &current);
                current = if self.cfg.chunk_overlap > 0 {
                    overlap_tail(&current, self.cfg.chunk_overlap)
                } else {
                    String::new()
                };
                fresh = 0;
            }
            current.push_str(&piece);
            fresh += piece_len;
        }
        if fresh > 0 {
            self.push_chunk(&mut chunks, &current);
        }
        chunks
    }

    fn push_chunk(&self, chunks: &mut Vec<String>, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.chars().count() >= self.cfg.min_fragment_len {
            chunks.push(trimmed.to_string());
        }
    }

    /// Recursively split `text` into pieces no longer than `chunk_size`,
    /// preferring the earliest separator in the cascade. Pieces keep their
    /// trailing separator so merging is plain concatenation.
    fn atomize(&self, text: &str, seps: &[&str]) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.cfg.chunk_size {
            return vec![text.to_string()];
        }
        match seps.first() {
            Some(sep) => {
                let parts: Vec<&str> = text.split_inclusive(*sep).collect();
                if parts.len() <= 1 {
                    return self.atomize(text, &seps[1..]);
                }
                let mut out = Vec::new();
                for part in parts {
                    if part.chars().count() <= self.cfg.chunk_size {
                        out.push(part.to_string());
                    } else {
                        out.extend(self.atomize(part, &seps[1..]));
                    }
                }
                out
            }
            None => hard_cut(text, self.cfg.chunk_size),
        }
    }
}

fn hard_cut(text: &str, size: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut n = 0usize;
    for c in text.chars() {
        buf.push(c);
        n += 1;
        if n == size {
            out.push(std::mem::take(&mut buf));
            n = 0;
        }
    }
    if n > 0 {
        out.push(buf);
    }
    out
}

/// Last `overlap` characters of `chunk`, extended backward to the
/// preceding whitespace boundary so the seed never starts mid-word and
/// always carries at least `overlap` characters into the next chunk.
/// Falls back to the exact cut when the chunk has no usable boundary.
fn overlap_tail(chunk: &str, overlap: usize) -> String {
    let chars: Vec<char> = chunk.chars().collect();
    if chars.len() <= overlap {
        return chunk.to_string();
    }
    let cut = chars.len() - overlap;
    let mut start = cut;
    if !chars[start].is_whitespace() {
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }
        if start == 0 {
            start = cut;
        }
    }
    chars[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(chunk_size: usize, chunk_overlap: usize, min_fragment_len: usize) -> ChunkingConfig {
        ChunkingConfig { chunk_size, chunk_overlap, min_fragment_len }
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = Chunker::new(cfg(1000, 200, 10));
        let chunks = chunker.split("A short paragraph about initiative order.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "A short paragraph about initiative order.");
    }

    #[test]
    fn chunks_below_the_floor_are_dropped() {
        let chunker = Chunker::new(cfg(1000, 200, 50));
        assert!(chunker.split("too short").is_empty());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let para_a = "alpha ".repeat(100); // 600 chars
        let para_b = "bravo ".repeat(100);
        let text = format!("{}\n\n{}", para_a.trim(), para_b.trim());
        let chunker = Chunker::new(cfg(1000, 0, 10));
        let chunks = chunker.split(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], para_a.trim());
        assert_eq!(chunks[1], para_b.trim());
    }

    #[test]
    fn size_invariant_holds() {
        let words: String = (0..500).map(|i| format!("w{i:04} ")).collect();
        let chunker = Chunker::new(cfg(100, 20, 10));
        let chunks = chunker.split(&words);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // the overlap seed snaps back to a word boundary, so the
            // tolerance is the overlap plus one 6-char word
            assert!(
                chunk.chars().count() <= 100 + 20 + 6,
                "chunk exceeds size budget: {} chars",
                chunk.chars().count()
            );
        }
    }

    /// Longest prefix of `next` that is also a suffix of `prev`.
    fn shared_overlap(prev: &str, next: &str) -> usize {
        let next_chars: Vec<char> = next.chars().collect();
        (1..=next_chars.len())
            .rev()
            .find(|&len| {
                let prefix: String = next_chars[..len].iter().collect();
                prev.ends_with(&prefix)
            })
            .unwrap_or(0)
    }

    #[test]
    fn adjacent_chunks_share_at_least_the_overlap() {
        let words: String = (0..500).map(|i| format!("w{i:04} ")).collect();
        let overlap = 20;
        let chunker = Chunker::new(cfg(100, overlap, 10));
        let chunks = chunker.split(&words);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            // trimming eats the boundary whitespace, everything else of the
            // seed must reappear verbatim at the head of the next chunk
            let shared = shared_overlap(&pair[0], &pair[1]);
            assert!(shared >= overlap - 1, "only {shared} chars carried over");
        }
    }

    #[test]
    fn no_overlap_when_disabled() {
        let words: String = (0..500).map(|i| format!("w{i:04} ")).collect();
        let chunker = Chunker::new(cfg(100, 0, 10));
        let chunks = chunker.split(&words);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let first_word = pair[1].split_whitespace().next().expect("non-empty chunk");
            assert!(!pair[0].contains(first_word));
        }
    }

    #[test]
    fn hard_cuts_unbroken_text() {
        let blob = "a".repeat(2500);
        let chunker = Chunker::new(cfg(1000, 0, 50));
        let chunks = chunker.split(&blob);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[1].len(), 1000);
        assert_eq!(chunks[2].len(), 500);
    }

    #[test]
    fn falls_back_to_line_boundaries() {
        let line_a = "alpha ".repeat(100);
        let line_b = "bravo ".repeat(100);
        let text = format!("{}\n{}", line_a.trim(), line_b.trim());
        let chunker = Chunker::new(cfg(1000, 0, 10));
        let chunks = chunker.split(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("alpha"));
        assert!(chunks[1].starts_with("bravo"));
    }
}
