//! Error taxonomy
//!
//! Configuration problems (bad orders, bad schemes) surface at construction
//! or at the score-call boundary, never mid-batch. Tokenizer failures are
//! input errors wrapped with the offending string; a failure on one
//! hypothesis aborts the whole batch with no partial results.
//!
//! Zero references, empty hypotheses and empty batches are defined
//! degenerate cases, not errors.

use thiserror::Error;

use crate::tokenize::TokenizeError;

/// Errors raised by the scoring engine.
#[derive(Debug, Error)]
pub enum BleuError {
    /// An n-gram order of zero was requested.
    #[error("n-gram order must be at least 1, got {0}")]
    InvalidOrder(usize),

    /// An empty order set or an empty scheme table was supplied.
    #[error("at least one n-gram order is required")]
    NoOrders,

    /// A weight scheme carries a negative or non-finite weight.
    #[error("weight for {order}-grams must be finite and non-negative, got {weight}")]
    InvalidWeight { order: usize, weight: f64 },

    /// A scoring scheme references an order the corpus does not track.
    #[error("scheme `{scheme}` references untracked n-gram order {order}")]
    UntrackedOrder { scheme: String, order: usize },

    /// The injected tokenizer failed on one input sentence.
    #[error("failed to tokenize input `{input}`: {source}")]
    Tokenize {
        input: String,
        #[source]
        source: TokenizeError,
    },

    /// An exported session state blob could not be parsed or is from an
    /// unsupported version.
    #[error("invalid session state: {0}")]
    InvalidState(String),
}
