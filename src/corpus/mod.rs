//! Corpus accumulator
//!
//! Incremental multi-reference BLEU engine. References are indexed exactly
//! once at append time; scoring reads only precomputed state:
//!
//! - per order n, a running map from n-gram to its maximum occurrence
//!   count across all references seen so far (standard multi-reference
//!   clipping uses the max, not the sum),
//! - the multiset of reference token lengths for brevity-penalty lookup.
//!
//! Formulas:
//! - Modified precision: `p_n = Σ_g min(count_h(g), max_ref(g)) / (|h| - n + 1)`,
//!   defined as 0 when `|h| < n`.
//! - Brevity penalty: `BP = 1` if `c > r`, else `exp(1 - r/c)`; `BP = 0`
//!   when `c = 0`. `r` is the reference length closest to `c`, ties
//!   resolved to the smaller length.
//! - Per-scheme score: `BP * exp(Σ w_n * ln p_n)`.
//!
//! Appending mutates the running index and takes `&mut self`; scoring is
//! read-only and takes `&self`. The borrow checker provides the
//! reader/writer exclusion the contract requires, and one score call may
//! fan its hypothesis batch out across rayon workers.

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, trace};
use rayon::prelude::*;

use crate::error::BleuError;
use crate::ngram::{Gram, NgramProfile};
use crate::smoothing::Smoothing;
use crate::types::{ScoreMatrix, WeightScheme};

/// Growing reference corpus with precomputed n-gram statistics.
#[derive(Clone, Debug)]
pub struct CorpusAccumulator {
    /// Tracked n-gram orders, ascending and deduplicated. Fixed for the
    /// lifetime of the accumulator.
    orders: Vec<usize>,
    /// Tokenized references in append order.
    references: Vec<Vec<String>>,
    /// Reference token lengths, ascending.
    sorted_lengths: Vec<usize>,
    /// Per order: n-gram -> maximum count across all references.
    max_counts: HashMap<usize, HashMap<Gram, u32>>,
}

impl CorpusAccumulator {
    /// Create an accumulator tracking the given n-gram orders.
    pub fn new(orders: &[usize]) -> Result<Self, BleuError> {
        if orders.is_empty() {
            return Err(BleuError::NoOrders);
        }
        if orders.contains(&0) {
            return Err(BleuError::InvalidOrder(0));
        }
        let mut sorted = orders.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let max_counts = sorted.iter().map(|&order| (order, HashMap::new())).collect();
        Ok(Self {
            orders: sorted,
            references: Vec::new(),
            sorted_lengths: Vec::new(),
            max_counts,
        })
    }

    /// Tracked orders, ascending.
    pub fn orders(&self) -> &[usize] {
        &self.orders
    }

    /// Whether `order` is part of the tracked set.
    pub fn is_tracked(&self, order: usize) -> bool {
        self.orders.binary_search(&order).is_ok()
    }

    /// Number of appended references. Only ever increases.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub(crate) fn reference_tokens(&self) -> &[Vec<String>] {
        &self.references
    }

    // ==================== Append ====================

    /// Append one tokenized reference.
    ///
    /// Builds the reference's n-gram profile over the tracked orders and
    /// folds it into the running max-count index; amortized cost is the
    /// n-gram count of the new reference. The empty token sequence is a
    /// valid length-0 reference that contributes only to length statistics.
    pub fn append(&mut self, tokens: Vec<String>) {
        let profile = NgramProfile::build(&tokens, &self.orders);
        for &order in &self.orders {
            let Some(counts) = profile.counts_for(order) else {
                continue;
            };
            let table = self.max_counts.entry(order).or_default();
            for (gram, &count) in counts {
                match table.get_mut(gram) {
                    Some(existing) => {
                        if count > *existing {
                            *existing = count;
                        }
                    }
                    None => {
                        table.insert(gram.clone(), count);
                    }
                }
            }
        }
        let len = tokens.len();
        let pos = self.sorted_lengths.partition_point(|&l| l <= len);
        self.sorted_lengths.insert(pos, len);
        self.references.push(tokens);
        trace!("appended reference {} (len {})", self.references.len(), len);
    }

    /// Append many tokenized references, in input order.
    pub fn append_all<I>(&mut self, references: I)
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        for tokens in references {
            self.append(tokens);
        }
    }

    /// Maximum count of `gram` across all references (0 if unseen).
    pub fn max_count(&self, order: usize, gram: &[String]) -> u32 {
        self.max_counts
            .get(&order)
            .and_then(|table| table.get(gram))
            .copied()
            .unwrap_or(0)
    }

    // ==================== Brevity Penalty ====================

    /// Reference length closest to `hyp_len`; ties pick the smaller length.
    pub fn closest_ref_length(&self, hyp_len: usize) -> Option<usize> {
        let lens = &self.sorted_lengths;
        let idx = lens.partition_point(|&l| l < hyp_len);
        let below = idx.checked_sub(1).map(|i| lens[i]);
        let above = lens.get(idx).copied();
        match (below, above) {
            (Some(b), Some(a)) => {
                // b < hyp_len <= a, so the diffs cannot underflow
                if hyp_len - b <= a - hyp_len {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (Some(b), None) => Some(b),
            (None, above) => above,
        }
    }

    /// Brevity penalty for hypothesis length `c` against the closest
    /// reference length `r`.
    pub fn brevity_penalty(c: usize, r: usize) -> f64 {
        if c == 0 {
            0.0
        } else if c > r {
            1.0
        } else {
            (1.0 - r as f64 / c as f64).exp()
        }
    }

    // ==================== Scoring ====================

    /// Reject schemes referencing untracked orders before any scoring work.
    pub fn validate_schemes(
        &self,
        schemes: &HashMap<String, WeightScheme>,
    ) -> Result<(), BleuError> {
        for (name, scheme) in schemes {
            for order in scheme.orders() {
                if !self.is_tracked(order) {
                    return Err(BleuError::UntrackedOrder {
                        scheme: name.clone(),
                        order,
                    });
                }
            }
        }
        Ok(())
    }

    /// Score a batch of tokenized hypotheses under the given schemes.
    ///
    /// Returns one score per hypothesis per scheme. Scheme validation
    /// happens up front so a configuration error never aborts a batch
    /// halfway. Hypotheses are scored in parallel against the shared
    /// read-only index.
    pub fn score_tokens(
        &self,
        hypotheses: &[Vec<String>],
        schemes: &HashMap<String, WeightScheme>,
        smoothing: Smoothing,
        auto_reweight: bool,
    ) -> Result<ScoreMatrix, BleuError> {
        self.validate_schemes(schemes)?;
        let started = Instant::now();

        let mut names: Vec<&String> = schemes.keys().collect();
        names.sort();
        let ordered: Vec<(&String, &WeightScheme)> =
            names.iter().map(|&name| (name, &schemes[name])).collect();

        let rows: Vec<Vec<f64>> = hypotheses
            .par_iter()
            .map(|tokens| self.score_hypothesis(tokens, &ordered, smoothing, auto_reweight))
            .collect();

        let mut matrix = ScoreMatrix::with_capacity(ordered.len());
        for (col, (name, _)) in ordered.iter().enumerate() {
            matrix.insert((*name).clone(), rows.iter().map(|row| row[col]).collect());
        }

        debug!(
            "scored {} hypotheses against {} references in {:?}",
            hypotheses.len(),
            self.references.len(),
            started.elapsed()
        );
        Ok(matrix)
    }

    /// Score one hypothesis under every scheme, sharing the per-order
    /// clipped counts and the brevity penalty across schemes.
    fn score_hypothesis(
        &self,
        tokens: &[String],
        schemes: &[(&String, &WeightScheme)],
        smoothing: Smoothing,
        auto_reweight: bool,
    ) -> Vec<f64> {
        let c = tokens.len();
        if self.references.is_empty() || c == 0 {
            return vec![0.0; schemes.len()];
        }

        let profile = NgramProfile::build(tokens, &self.orders);
        let stats: HashMap<usize, (u64, u64)> = self
            .orders
            .iter()
            .map(|&order| {
                let clipped = profile
                    .counts_for(order)
                    .map(|counts| {
                        counts
                            .iter()
                            .map(|(gram, &count)| {
                                u64::from(count.min(self.max_count(order, gram)))
                            })
                            .sum::<u64>()
                    })
                    .unwrap_or(0);
                (order, (clipped, NgramProfile::total_ngrams(c, order)))
            })
            .collect();

        let r = match self.closest_ref_length(c) {
            Some(r) => r,
            None => return vec![0.0; schemes.len()],
        };
        let bp = Self::brevity_penalty(c, r);

        schemes
            .iter()
            .map(|(_, scheme)| {
                let effective = self.effective_weights(scheme, c, auto_reweight);
                let mut log_sum = 0.0;
                for (order, weight) in effective.iter() {
                    if weight == 0.0 {
                        continue;
                    }
                    let (clipped, total) = stats.get(&order).copied().unwrap_or((0, 0));
                    let p = smoothing.precision(order, clipped, total);
                    if p <= 0.0 {
                        return 0.0;
                    }
                    log_sum += weight * p.ln();
                }
                bp * log_sum.exp()
            })
            .collect()
    }

    /// Auto-reweighting for hypotheses shorter than a scheme's highest
    /// order: uniform weights over `1..=|h|`, provided those orders are
    /// tracked. Otherwise the scheme is used unchanged.
    fn effective_weights(
        &self,
        scheme: &WeightScheme,
        hyp_len: usize,
        auto_reweight: bool,
    ) -> WeightScheme {
        if auto_reweight && hyp_len > 0 && hyp_len < scheme.max_order() {
            let tracked_prefix = (1..=hyp_len).all(|order| self.is_tracked(order));
            if tracked_prefix {
                if let Ok(uniform) = WeightScheme::uniform(hyp_len) {
                    return uniform;
                }
            }
        }
        scheme.clone()
    }
}
