//! Precision smoothing policies
//!
//! Geometric-mean BLEU collapses to zero as soon as one modified precision
//! is zero, which is common for high orders on short hypotheses. The
//! smoothing policy decides what to substitute for a zero precision. It is
//! a closed set of variants chosen at construction, not a runtime hook,
//! and every variant is deterministic.
//!
//! Conventions follow Chen & Cherry (2014) as popularized by NLTK:
//! - [`Smoothing::Epsilon`] is method 1 (epsilon over the denominator),
//! - [`Smoothing::AddK`] is method 2 (add k for orders above 1).

use serde::{Deserialize, Serialize};

/// Default epsilon substituted for zero numerators (NLTK convention).
pub const DEFAULT_EPSILON: f64 = 0.1;

/// Default additive constant for add-k smoothing.
pub const DEFAULT_ADD_K: f64 = 1.0;

/// Policy applied when a per-order precision has a zero numerator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    /// No smoothing: any zero precision zeroes the whole scheme score.
    None,
    /// Replace a zero numerator with `epsilon / denominator`.
    Epsilon { epsilon: f64 },
    /// Add `k` to numerator and denominator for orders above 1.
    AddK { k: f64 },
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::Epsilon {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl Smoothing {
    /// Modified precision for one order.
    ///
    /// `clipped` is the summed clipped count and `total` the number of
    /// hypothesis n-grams of that order. A zero denominator always yields
    /// 0.0 regardless of policy: no smoothing can invent n-grams the
    /// hypothesis does not have.
    pub fn precision(&self, order: usize, clipped: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        match *self {
            Smoothing::None => clipped as f64 / total,
            Smoothing::Epsilon { epsilon } => {
                if clipped == 0 {
                    epsilon / total
                } else {
                    clipped as f64 / total
                }
            }
            Smoothing::AddK { k } => {
                if order > 1 {
                    (clipped as f64 + k) / (total + k)
                } else {
                    clipped as f64 / total
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_passes_through() {
        let s = Smoothing::None;
        assert_eq!(s.precision(1, 2, 4), 0.5);
        assert_eq!(s.precision(2, 0, 4), 0.0);
    }

    #[test]
    fn test_zero_denominator_is_zero_for_all_policies() {
        for s in [
            Smoothing::None,
            Smoothing::Epsilon { epsilon: 0.1 },
            Smoothing::AddK { k: 1.0 },
        ] {
            assert_eq!(s.precision(3, 0, 0), 0.0);
        }
    }

    #[test]
    fn test_epsilon_rescues_zero_numerator() {
        let s = Smoothing::Epsilon { epsilon: 0.1 };
        assert_eq!(s.precision(2, 0, 4), 0.1 / 4.0);
        // Non-zero numerators are left untouched
        assert_eq!(s.precision(2, 3, 4), 0.75);
    }

    #[test]
    fn test_add_k_skips_unigrams() {
        let s = Smoothing::AddK { k: DEFAULT_ADD_K };
        assert_eq!(s.precision(1, 0, 4), 0.0);
        assert_eq!(s.precision(2, 0, 4), 1.0 / 5.0);
        assert_eq!(s.precision(2, 2, 4), 3.0 / 5.0);
    }

    #[test]
    fn test_default_is_epsilon() {
        assert_eq!(
            Smoothing::default(),
            Smoothing::Epsilon {
                epsilon: DEFAULT_EPSILON
            }
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let s = Smoothing::AddK { k: 0.5 };
        let json = serde_json::to_string(&s).unwrap();
        let back: Smoothing = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
