//! N-gram indexing
//!
//! Pure construction of per-order n-gram occurrence counts for a single
//! tokenized sentence. The same profile type serves references (indexed
//! once at append time) and hypotheses (indexed once per score call).

use std::collections::HashMap;

/// A contiguous sequence of n tokens.
pub type Gram = Vec<String>;

/// Per-order n-gram occurrence counts for one sentence.
///
/// For every requested order n the profile holds a map from n-gram to its
/// exact multiplicity within the sentence. An order longer than the
/// sentence maps to an empty table; that is a zero-overlap contribution,
/// not an error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NgramProfile {
    len: usize,
    counts: HashMap<usize, HashMap<Gram, u32>>,
}

impl NgramProfile {
    /// Build a profile for `tokens` over the given n-gram orders.
    ///
    /// Deterministic and side-effect-free; order entries with `order == 0`
    /// are ignored (the engine validates orders before reaching here).
    pub fn build(tokens: &[String], orders: &[usize]) -> Self {
        let mut counts = HashMap::with_capacity(orders.len());
        for &order in orders {
            if order == 0 {
                continue;
            }
            let mut table: HashMap<Gram, u32> = HashMap::new();
            if tokens.len() >= order {
                for window in tokens.windows(order) {
                    *table.entry(window.to_vec()).or_insert(0) += 1;
                }
            }
            counts.insert(order, table);
        }
        Self {
            len: tokens.len(),
            counts,
        }
    }

    /// Token length of the underlying sentence.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Occurrence counts for one order, if it was requested at build time.
    pub fn counts_for(&self, order: usize) -> Option<&HashMap<Gram, u32>> {
        self.counts.get(&order)
    }

    /// Total number of n-grams of `order` in a sentence of `len` tokens:
    /// `len - order + 1`, or 0 when the sentence is too short.
    pub fn total_ngrams(len: usize, order: usize) -> u64 {
        if order >= 1 && len >= order {
            (len - order + 1) as u64
        } else {
            0
        }
    }
}
