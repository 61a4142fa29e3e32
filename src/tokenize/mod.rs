//! Tokenizer collaborator
//!
//! Tokenization is injected at construction time; the engine never manages
//! dictionaries, downloads or locale state. Implementations must be
//! deterministic and side-effect-free from the engine's perspective: any
//! resource initialization happens before the tokenizer is handed over.

use thiserror::Error;

/// Failure reported by a tokenizer implementation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TokenizeError(pub String);

/// Splits a raw sentence into an ordered token sequence.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Result<Vec<String>, TokenizeError> + Send + Sync,
{
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        self(text)
    }
}

/// Whitespace tokenizer with optional lowercasing.
///
/// Splits on Unicode whitespace and never fails. Good enough for scoring
/// pre-normalized model output; callers with stronger needs inject their
/// own [`Tokenizer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct WhitespaceTokenizer {
    /// Lowercase the sentence before splitting.
    pub lowercase: bool,
}

impl WhitespaceTokenizer {
    pub fn new(lowercase: bool) -> Self {
        Self { lowercase }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        let tokens = if self.lowercase {
            text.to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect()
        } else {
            text.split_whitespace().map(str::to_string).collect()
        };
        Ok(tokens)
    }
}
