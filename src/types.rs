//! Common types and constants
//!
//! Shared data structures used across the scoring engine: weight schemes,
//! session options and the serializable session state.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::BleuError;
use crate::smoothing::Smoothing;

// ==================== Constants ====================

/// Default BLEU variants evaluated by a session.
pub const DEFAULT_ORDERS: [usize; 3] = [3, 4, 6];

/// Version tag for exported session state.
pub const STATE_VERSION: u32 = 1;

// ==================== Score Output ====================

/// Scheme name -> one score per hypothesis, in batch order.
pub type ScoreMatrix = HashMap<String, Vec<f64>>;

// ==================== Weight Schemes ====================

/// Named per-order weights defining one BLEU variant.
///
/// A scheme maps n-gram orders to non-negative weights; the per-scheme
/// score is `BP * exp(Σ w_n * ln p_n)` over the orders it references.
/// Normalization is the caller's choice; the standard BLEU-n scheme from
/// [`WeightScheme::uniform`] sums to 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightScheme {
    weights: BTreeMap<usize, f64>,
}

impl WeightScheme {
    /// Create a scheme from `(order, weight)` pairs.
    ///
    /// Orders must be at least 1 and weights finite and non-negative. A
    /// duplicate order keeps the last weight given.
    pub fn new<I>(weights: I) -> Result<Self, BleuError>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut map = BTreeMap::new();
        for (order, weight) in weights {
            if order == 0 {
                return Err(BleuError::InvalidOrder(0));
            }
            // A NaN weight would slip past `< 0.0` and poison every score
            if !weight.is_finite() || weight < 0.0 {
                return Err(BleuError::InvalidWeight { order, weight });
            }
            map.insert(order, weight);
        }
        if map.is_empty() {
            return Err(BleuError::NoOrders);
        }
        Ok(Self { weights: map })
    }

    /// Standard BLEU-n: uniform weight `1/n` over orders `1..=n`.
    pub fn uniform(n: usize) -> Result<Self, BleuError> {
        if n == 0 {
            return Err(BleuError::InvalidOrder(0));
        }
        let w = 1.0 / n as f64;
        Ok(Self {
            weights: (1..=n).map(|order| (order, w)).collect(),
        })
    }

    /// Orders referenced by this scheme, ascending.
    pub fn orders(&self) -> impl Iterator<Item = usize> + '_ {
        self.weights.keys().copied()
    }

    /// `(order, weight)` pairs, ascending by order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.weights.iter().map(|(&order, &weight)| (order, weight))
    }

    /// Highest order referenced by this scheme.
    pub fn max_order(&self) -> usize {
        self.weights.keys().next_back().copied().unwrap_or(0)
    }
}

// ==================== Session Options ====================

/// Configuration for a scoring session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelfBleuOptions {
    /// BLEU variants to evaluate (default `[3, 4, 6]`). For each listed n
    /// a scheme named `"n-gram"` with uniform weights over orders `1..=n`
    /// is installed unless `schemes` is given, and orders `1..=max` are
    /// tracked by the corpus.
    pub orders: Option<Vec<usize>>,
    /// Custom schemes replacing the defaults. With `orders` set, each
    /// scheme may only reference orders up to the tracked maximum; with
    /// `orders` unset, the tracked set is the union of the scheme orders.
    pub schemes: Option<HashMap<String, WeightScheme>>,
    /// Smoothing policy (default: epsilon smoothing with 0.1).
    pub smoothing: Option<Smoothing>,
    /// Fall back to uniform weights over `1..=|h|` for hypotheses shorter
    /// than a scheme's highest order (default false).
    pub auto_reweight: Option<bool>,
}

impl Default for SelfBleuOptions {
    fn default() -> Self {
        Self {
            orders: Some(DEFAULT_ORDERS.to_vec()),
            schemes: None,
            smoothing: Some(Smoothing::default()),
            auto_reweight: Some(false),
        }
    }
}

// ==================== Session State ====================

/// Serializable session state for persistence across reward sessions.
///
/// Holds the tokenized references in append order; importing rebuilds the
/// n-gram indices deterministically under the current configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelfBleuState {
    /// Version number (for migration).
    pub version: u32,
    /// Tokenized reference sentences in append order.
    pub references: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== WeightScheme tests ====================

    #[test]
    fn test_uniform_scheme() {
        let scheme = WeightScheme::uniform(4).unwrap();
        let pairs: Vec<(usize, f64)> = scheme.iter().collect();
        assert_eq!(
            pairs,
            vec![(1, 0.25), (2, 0.25), (3, 0.25), (4, 0.25)]
        );
        assert_eq!(scheme.max_order(), 4);
    }

    #[test]
    fn test_uniform_rejects_zero() {
        assert!(matches!(
            WeightScheme::uniform(0),
            Err(BleuError::InvalidOrder(0))
        ));
    }

    #[test]
    fn test_new_rejects_order_zero() {
        assert!(matches!(
            WeightScheme::new([(0, 1.0)]),
            Err(BleuError::InvalidOrder(0))
        ));
    }

    #[test]
    fn test_new_rejects_negative_weight() {
        assert!(matches!(
            WeightScheme::new([(2, -0.5)]),
            Err(BleuError::InvalidWeight { order: 2, .. })
        ));
    }

    #[test]
    fn test_new_rejects_non_finite_weights() {
        assert!(matches!(
            WeightScheme::new([(1, f64::NAN)]),
            Err(BleuError::InvalidWeight { order: 1, .. })
        ));
        assert!(matches!(
            WeightScheme::new([(1, 0.5), (3, f64::INFINITY)]),
            Err(BleuError::InvalidWeight { order: 3, .. })
        ));
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            WeightScheme::new(std::iter::empty()),
            Err(BleuError::NoOrders)
        ));
    }

    #[test]
    fn test_sparse_orders() {
        let scheme = WeightScheme::new([(3, 0.5), (6, 0.5)]).unwrap();
        assert_eq!(scheme.orders().collect::<Vec<_>>(), vec![3, 6]);
        assert_eq!(scheme.max_order(), 6);
    }

    #[test]
    fn test_scheme_serde_round_trip() {
        let scheme = WeightScheme::uniform(3).unwrap();
        let json = serde_json::to_string(&scheme).unwrap();
        let back: WeightScheme = serde_json::from_str(&json).unwrap();
        assert_eq!(scheme, back);
    }

    // ==================== Options tests ====================

    #[test]
    fn test_default_options() {
        let options = SelfBleuOptions::default();
        assert_eq!(options.orders, Some(vec![3, 4, 6]));
        assert!(options.schemes.is_none());
        assert_eq!(options.smoothing, Some(Smoothing::default()));
        assert_eq!(options.auto_reweight, Some(false));
    }

    // ==================== State tests ====================

    #[test]
    fn test_state_serde_round_trip() {
        let state = SelfBleuState {
            version: STATE_VERSION,
            references: vec![
                vec!["the".to_string(), "cat".to_string()],
                vec![],
            ],
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: SelfBleuState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
