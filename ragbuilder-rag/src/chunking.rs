//! Text chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], which
//! cuts text into consecutive windows of `target_tokens * CHARS_PER_TOKEN`
//! characters. Windows ignore word boundaries and may split a word.

use crate::error::{RagError, Result};

/// Rough number of characters per token used to size windows.
pub const CHARS_PER_TOKEN: usize = 6;

/// Default window size in tokens.
pub const DEFAULT_TARGET_TOKENS: usize = 500;

/// A strategy for splitting text into chunks.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks.
    ///
    /// Returns an empty `Vec` if the text is empty.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text into fixed-size windows measured in characters.
///
/// Without overlap the chunks concatenate back to the input exactly. The last
/// window may be shorter than the others.
///
/// # Example
///
/// ```rust,ignore
/// use ragbuilder_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(500)?.with_overlap(50)?;
/// let chunks = chunker.chunk(&text);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSizeChunker {
    window: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    /// Create a chunker whose windows hold `target_tokens * 6` characters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `target_tokens` is zero.
    pub fn new(target_tokens: usize) -> Result<Self> {
        if target_tokens == 0 {
            return Err(RagError::InvalidArgument(
                "target_tokens must be greater than zero".to_string(),
            ));
        }
        Self::from_chars(target_tokens.saturating_mul(CHARS_PER_TOKEN))
    }

    /// Create a chunker with an explicit window size in characters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `window` is zero.
    pub fn from_chars(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(RagError::InvalidArgument("window size must be greater than zero".into()));
        }
        Ok(Self { window, overlap: 0 })
    }

    /// Make consecutive windows share `overlap_tokens * 6` characters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if the overlap is not smaller than
    /// the window.
    pub fn with_overlap(self, overlap_tokens: usize) -> Result<Self> {
        self.with_overlap_chars(overlap_tokens.saturating_mul(CHARS_PER_TOKEN))
    }

    /// Make consecutive windows share `overlap` characters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `overlap >= window`.
    pub fn with_overlap_chars(mut self, overlap: usize) -> Result<Self> {
        if overlap >= self.window {
            return Err(RagError::InvalidArgument(format!(
                "overlap ({overlap} chars) must be less than the window ({} chars)",
                self.window
            )));
        }
        self.overlap = overlap;
        Ok(self)
    }

    /// Window size in characters.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Overlap between consecutive windows in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self { window: DEFAULT_TARGET_TOKENS * CHARS_PER_TOKEN, overlap: 0 }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char plus the end, so windows never cut a code point.
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        bounds.push(text.len());
        let char_count = bounds.len() - 1;

        let step = self.window - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < char_count {
            let end = (start + self.window).min(char_count);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Split `text` into windows of `target_tokens * 6` characters with no overlap.
///
/// # Errors
///
/// Returns [`RagError::InvalidArgument`] if `target_tokens` is zero.
pub fn chunk(text: &str, target_tokens: usize) -> Result<Vec<String>> {
    Ok(FixedSizeChunker::new(target_tokens)?.chunk(text))
}
