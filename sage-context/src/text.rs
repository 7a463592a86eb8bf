//! Splitting of extracted document text into overlapping chunks for the retrieval index.
//!
//! The retrieval index stores documents as bounded segments ("chunks"). Successive chunks
//! of the same document share an overlap so that a sentence falling on a cut is still
//! retrievable as a whole from at least one chunk.
//!
//! The module defines two main structs:
//! - [`TextSplitter`]: Holds validated chunking parameters and a set of delimiter
//!   patterns, and produces chunks from text.
//! - [`TextChunk`]: A single segment with its position in the source text.
//!
//! # Windowing
//!
//! Windows are at most `chunk_size` characters long and each one starts exactly `overlap`
//! characters before the end of the previous one. Window ends are anchored to a fixed
//! grid (`chunk_size + i * (chunk_size - overlap)`). Before cutting, the splitter looks a
//! little way back from the grid position (a quarter of the step at most) for a natural
//! boundary, trying the delimiters in order: paragraph breaks, then line breaks, then
//! sentence ends, then any whitespace. When nothing matches, it cuts hard at the window
//! edge. Because ends never drift from the grid by more than that slack, the chunk count
//! stays within one of `ceil((len - overlap) / (chunk_size - overlap))`.
//!
//! All lengths and offsets are counted in `char`s, never bytes, so multi-byte text is
//! never cut inside a code point.
//!
//! # Usage
//!
//! ```
//! use sage_context::text::TextSplitter;
//!
//! let splitter = TextSplitter::new(100, 20).unwrap();
//! let text = "Rust is a systems language. ".repeat(20);
//! let chunks = splitter.get_chunks(&text);
//!
//! assert!(chunks.len() > 1);
//! assert!(chunks.iter().all(|c| c.char_len() <= 100));
//!
//! // Every chunk after the first starts `overlap` characters before the previous end.
//! for pair in chunks.windows(2) {
//!     assert_eq!(pair[1].start, pair[0].end - 20);
//! }
//! ```
use regex::Regex;
use serde::Serialize;
use std::path::Path;

/// Chunk size used by the ingestion pipeline, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Overlap between consecutive chunks used by the ingestion pipeline, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Delimiters for plain prose, ordered from most to least significant.
///
/// - `\n\s*\n`: Paragraph breaks (blank line, possibly with trailing spaces).
/// - `\n`: Line breaks.
/// - `[.!?]["')\]]*\s`: Sentence ends, including a closing quote or bracket.
/// - `\s`: Any whitespace, the most granular delimiter.
pub const PROSE_DELIMITERS: &[&str] = &[
    r"\n\s*\n",          // Paragraphs
    r"\n",               // Line breaks
    r#"[.!?]["')\]]*\s"#, // Sentence ends
    r"\s",               // Whitespace
];

/// Delimiters for Markdown. Code fences come first so a fenced block is kept together
/// when it fits in a window.
pub const MARKDOWN_DELIMITERS: &[&str] = &[
    r"\n```[^\n]*\n",     // Code block fences
    r"\n\s*\n",           // Paragraphs
    r"\n",                // Line breaks
    r#"[.!?]["')\]]*\s"#, // Sentence ends
    r"\s",                // Whitespace
];

/// Get delimiters appropriate for a document, based on its file extension.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use sage_context::text::{delimiters_for_path, MARKDOWN_DELIMITERS, PROSE_DELIMITERS};
///
/// assert_eq!(delimiters_for_path(Path::new("notes/todo.md")), MARKDOWN_DELIMITERS);
/// assert_eq!(delimiters_for_path(Path::new("papers/thesis.pdf")), PROSE_DELIMITERS);
/// ```
pub fn delimiters_for_path(path: &Path) -> &'static [&'static str] {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("md") | Some("markdown") => MARKDOWN_DELIMITERS,
        _ => PROSE_DELIMITERS,
    }
}

/// Errors raised when chunking parameters are unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    /// Chunk size, overlap, or a delimiter pattern is invalid
    #[error("Invalid chunking configuration: {message}")]
    InvalidConfig { message: String },
}

impl ChunkError {
    fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// A single chunk of text extracted from a document.
///
/// `start` and `end` are `char` offsets into the source text, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// The sequence number of this chunk within the document (0-indexed).
    pub sequence: usize,
    /// Offset of the first character of this chunk.
    pub start: usize,
    /// Offset one past the last character of this chunk.
    pub end: usize,
    /// The text content of this chunk.
    pub chunk_text: String,
}

impl TextChunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Splits text into overlapping, bounded windows.
///
/// Parameters are validated once at construction, so a splitter that exists can always
/// chunk any input.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
    delimiters: Vec<Regex>,
}

impl TextSplitter {
    /// Creates a splitter for prose with the given window size and overlap.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if `chunk_size` is zero or `overlap` is not
    /// smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        Self::with_delimiters(chunk_size, overlap, PROSE_DELIMITERS)
    }

    /// Creates a splitter with custom delimiter patterns.
    ///
    /// Delimiters are tried in the order they appear in the slice, from most
    /// significant (e.g. paragraph break) to least significant (e.g. a space). A cut
    /// happens right after a delimiter match.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] for bad sizes or a pattern that is not a
    /// valid regular expression.
    pub fn with_delimiters(
        chunk_size: usize,
        overlap: usize,
        delimiter_patterns: &[&str],
    ) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::invalid_config("chunk size must be at least 1"));
        }
        if overlap >= chunk_size {
            return Err(ChunkError::invalid_config(format!(
                "overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }

        let delimiters = delimiter_patterns
            .iter()
            .map(|&pattern| {
                Regex::new(pattern).map_err(|e| {
                    ChunkError::invalid_config(format!("bad delimiter pattern {pattern:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            chunk_size,
            overlap,
            delimiters,
        })
    }

    /// Creates a splitter whose delimiters suit the document at `path`.
    pub fn for_path(path: &Path, chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        Self::with_delimiters(chunk_size, overlap, delimiters_for_path(path))
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `text` into chunks.
    ///
    /// Empty text yields no chunks; text no longer than the chunk size yields exactly one
    /// chunk equal to the text.
    pub fn get_chunks(&self, text: &str) -> Vec<TextChunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the text.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = offsets.len() - 1;

        let make_chunk = |sequence: usize, start: usize, end: usize| TextChunk {
            sequence,
            start,
            end,
            chunk_text: text[offsets[start]..offsets[end]].to_string(),
        };

        if char_count <= self.chunk_size {
            return vec![make_chunk(0, 0, char_count)];
        }

        let step = self.chunk_size - self.overlap;
        let slack = step / 4;

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut grid_end = self.chunk_size;

        loop {
            let upper = grid_end.min(start + self.chunk_size);
            if upper >= char_count {
                chunks.push(make_chunk(chunks.len(), start, char_count));
                break;
            }

            // Cutting at or before `start + overlap` would stall the next window.
            let lower = grid_end.saturating_sub(slack).max(start + self.overlap + 1);
            let end = self
                .find_boundary(text, &offsets, start, lower, upper)
                .unwrap_or(upper);

            chunks.push(make_chunk(chunks.len(), start, end));
            start = end - self.overlap;
            grid_end += step;
        }

        chunks
    }

    /// Splits `text` and returns only the chunk texts.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.get_chunks(text)
            .into_iter()
            .map(|chunk| chunk.chunk_text)
            .collect()
    }

    // Returns the char position right after the last match of the most significant
    // delimiter that ends inside [lower, upper].
    fn find_boundary(
        &self,
        text: &str,
        offsets: &[usize],
        start: usize,
        lower: usize,
        upper: usize,
    ) -> Option<usize> {
        let base = offsets[start];
        let window = &text[base..offsets[upper]];

        self.delimiters.iter().find_map(|delimiter| {
            delimiter
                .find_iter(window)
                .filter(|m| !m.as_str().is_empty())
                .filter_map(|m| offsets.binary_search(&(base + m.end())).ok())
                .filter(|&pos| pos >= lower && pos <= upper)
                .last()
        })
    }
}

/// Splits `text` into overlapping chunks of at most `chunk_size` characters.
///
/// Convenience wrapper around [`TextSplitter::new`] and [`TextSplitter::split`].
///
/// # Errors
///
/// Returns [`ChunkError::InvalidConfig`] when `overlap >= chunk_size` or `chunk_size == 0`.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    Ok(TextSplitter::new(chunk_size, overlap)?.split(text))
}
