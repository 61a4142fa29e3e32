//! # self-bleu - Incremental multi-gram BLEU scoring engine
//!
//! This crate computes corpus-level self-BLEU scores as a reward signal
//! for text generation loops:
//!
//! - **Incremental corpus** - references are indexed once at append time;
//!   scoring never rescans the reference set
//! - **Multiple weight schemes** - one pass over a hypothesis scores every
//!   configured BLEU variant (BLEU-3, BLEU-4, BLEU-6 by default)
//! - **Deterministic smoothing** - epsilon and add-k policies for the
//!   zero-precision collapse of the geometric mean
//! - **Parallel batches** - hypotheses within a batch are scored on a
//!   rayon thread pool
//!
//! ## Module structure
//!
//! - [`reward`] - session surface (tokenizer injection, options, state)
//! - [`corpus`] - append-only reference accumulator and scoring core
//! - [`ngram`] - per-sentence n-gram occurrence counts
//! - [`smoothing`] - precision smoothing policies
//! - [`tokenize`] - tokenizer trait and whitespace default
//! - [`types`] - weight schemes, options, session state
//! - [`error`] - error taxonomy
//!
//! ## Example
//!
//! ```rust
//! use self_bleu::{SelfBleuReward, WhitespaceTokenizer};
//!
//! let mut session = SelfBleuReward::new(WhitespaceTokenizer::default())?;
//! session.append_reference("the cat sat on the mat")?;
//!
//! let scores = session.score(&["the cat sat on the mat"])?;
//! assert!((scores["3-gram"][0] - 1.0).abs() < 1e-12);
//! # Ok::<(), self_bleu::BleuError>(())
//! ```

// ============================================================================
// Module declarations
// ============================================================================

pub mod corpus;
pub mod error;
pub mod ngram;
pub mod reward;
pub mod smoothing;
pub mod tokenize;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export the session surface
pub use reward::SelfBleuReward;

/// Re-export the scoring core
pub use corpus::CorpusAccumulator;

/// Re-export the n-gram index
pub use ngram::{Gram, NgramProfile};

/// Re-export smoothing policies
pub use smoothing::{Smoothing, DEFAULT_ADD_K, DEFAULT_EPSILON};

/// Re-export the tokenizer seam
pub use tokenize::{TokenizeError, Tokenizer, WhitespaceTokenizer};

/// Re-export common types and constants
pub use types::{
    ScoreMatrix, SelfBleuOptions, SelfBleuState, WeightScheme, DEFAULT_ORDERS, STATE_VERSION,
};

/// Re-export the error taxonomy
pub use error::BleuError;
