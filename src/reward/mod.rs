//! Self-BLEU reward session
//!
//! The public surface for reward loops: a session object owning the
//! injected tokenizer, the resolved weight schemes and the reference
//! corpus. Created once per reward session, it grows monotonically via
//! `append_reference` and is read many times via `score`.
//!
//! Callers pass raw strings; tokenization happens internally through the
//! injected collaborator. Scoring a batch of H hypotheses against R
//! accumulated references never re-tokenizes or re-indexes a reference.

use std::collections::HashMap;

use crate::corpus::CorpusAccumulator;
use crate::error::BleuError;
use crate::smoothing::Smoothing;
use crate::tokenize::Tokenizer;
use crate::types::{
    ScoreMatrix, SelfBleuOptions, SelfBleuState, WeightScheme, DEFAULT_ORDERS, STATE_VERSION,
};

/// Incremental self-BLEU scorer for reward loops.
///
/// With the default options this evaluates BLEU-3, BLEU-4 and BLEU-6
/// (schemes `"3-gram"`, `"4-gram"`, `"6-gram"`) under epsilon smoothing.
pub struct SelfBleuReward {
    tokenizer: Box<dyn Tokenizer>,
    corpus: CorpusAccumulator,
    schemes: HashMap<String, WeightScheme>,
    smoothing: Smoothing,
    auto_reweight: bool,
}

impl std::fmt::Debug for SelfBleuReward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfBleuReward").finish_non_exhaustive()
    }
}

impl SelfBleuReward {
    /// Create a session with default options.
    pub fn new<T>(tokenizer: T) -> Result<Self, BleuError>
    where
        T: Tokenizer + 'static,
    {
        Self::with_options(tokenizer, SelfBleuOptions::default())
    }

    /// Create a session with custom options.
    ///
    /// The tracked order set is `1..=max(orders)` when `orders` is given
    /// (every default scheme needs the full prefix), or the union of the
    /// scheme orders when only custom schemes are given. Configuration
    /// errors surface here, never during scoring.
    pub fn with_options<T>(tokenizer: T, options: SelfBleuOptions) -> Result<Self, BleuError>
    where
        T: Tokenizer + 'static,
    {
        let SelfBleuOptions {
            orders,
            schemes,
            smoothing,
            auto_reweight,
        } = options;

        let (tracked, schemes) = match (orders, schemes) {
            (orders, None) => {
                let orders = orders.unwrap_or_else(|| DEFAULT_ORDERS.to_vec());
                let max = validated_max_order(&orders)?;
                let mut defaults = HashMap::with_capacity(orders.len());
                for &n in &orders {
                    defaults.insert(format!("{n}-gram"), WeightScheme::uniform(n)?);
                }
                ((1..=max).collect::<Vec<_>>(), defaults)
            }
            (Some(orders), Some(custom)) => {
                let max = validated_max_order(&orders)?;
                if custom.is_empty() {
                    return Err(BleuError::NoOrders);
                }
                ((1..=max).collect(), custom)
            }
            (None, Some(custom)) => {
                if custom.is_empty() {
                    return Err(BleuError::NoOrders);
                }
                let mut tracked = Vec::new();
                for scheme in custom.values() {
                    tracked.extend(scheme.orders());
                }
                tracked.sort_unstable();
                tracked.dedup();
                (tracked, custom)
            }
        };

        let corpus = CorpusAccumulator::new(&tracked)?;
        corpus.validate_schemes(&schemes)?;

        Ok(Self {
            tokenizer: Box::new(tokenizer),
            corpus,
            schemes,
            smoothing: smoothing.unwrap_or_default(),
            auto_reweight: auto_reweight.unwrap_or(false),
        })
    }

    // ==================== Append ====================

    /// Tokenize and append one reference sentence.
    pub fn append_reference(&mut self, text: &str) -> Result<(), BleuError> {
        let tokens = self.tokenize(text)?;
        self.corpus.append(tokens);
        Ok(())
    }

    /// Tokenize and append many reference sentences, in input order.
    ///
    /// All sentences are tokenized before any is appended, so a tokenizer
    /// failure leaves the corpus unchanged.
    pub fn append_references<I, S>(&mut self, texts: I) -> Result<(), BleuError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokenized = texts
            .into_iter()
            .map(|text| self.tokenize(text.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.corpus.append_all(tokenized);
        Ok(())
    }

    // ==================== Score ====================

    /// Score a batch of raw hypotheses under the configured schemes.
    ///
    /// Returns one score per hypothesis per scheme. An empty batch yields
    /// empty per-scheme vectors; with zero references every score is 0.0.
    pub fn score<S>(&self, hypotheses: &[S]) -> Result<ScoreMatrix, BleuError>
    where
        S: AsRef<str>,
    {
        self.score_with_schemes(hypotheses, &self.schemes)
    }

    /// Score under an ad-hoc scheme table.
    ///
    /// Every scheme must reference only tracked orders; the whole batch is
    /// rejected up front otherwise.
    pub fn score_with_schemes<S>(
        &self,
        hypotheses: &[S],
        schemes: &HashMap<String, WeightScheme>,
    ) -> Result<ScoreMatrix, BleuError>
    where
        S: AsRef<str>,
    {
        let tokenized = hypotheses
            .iter()
            .map(|hyp| self.tokenize(hyp.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.corpus
            .score_tokens(&tokenized, schemes, self.smoothing, self.auto_reweight)
    }

    /// Mean score across schemes, one value per hypothesis.
    ///
    /// This is the scalar reward signal consumed by training loops.
    pub fn reward<S>(&self, hypotheses: &[S]) -> Result<Vec<f64>, BleuError>
    where
        S: AsRef<str>,
    {
        let matrix = self.score(hypotheses)?;
        let mut means = vec![0.0; hypotheses.len()];
        if matrix.is_empty() {
            return Ok(means);
        }
        for scores in matrix.values() {
            for (mean, &score) in means.iter_mut().zip(scores) {
                *mean += score;
            }
        }
        let scheme_count = matrix.len() as f64;
        for mean in &mut means {
            *mean /= scheme_count;
        }
        Ok(means)
    }

    // ==================== Introspection ====================

    /// Number of references appended so far.
    pub fn reference_count(&self) -> usize {
        self.corpus.reference_count()
    }

    /// Scheme names configured for this session, ascending.
    pub fn scheme_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// N-gram orders tracked by the corpus, ascending.
    pub fn tracked_orders(&self) -> &[usize] {
        self.corpus.orders()
    }

    /// Smoothing policy in effect.
    pub fn smoothing(&self) -> Smoothing {
        self.smoothing
    }

    // ==================== Persistence ====================

    /// Export the session state as a versioned JSON blob.
    pub fn export_state(&self) -> Result<String, BleuError> {
        let state = SelfBleuState {
            version: STATE_VERSION,
            references: self.corpus.reference_tokens().to_vec(),
        };
        serde_json::to_string(&state).map_err(|e| BleuError::InvalidState(e.to_string()))
    }

    /// Rebuild a session from an exported state blob.
    ///
    /// The references are re-indexed under the given options, so the
    /// restored session scores identically to the exporting one when the
    /// configurations match.
    pub fn from_state<T>(
        tokenizer: T,
        options: SelfBleuOptions,
        state: &str,
    ) -> Result<Self, BleuError>
    where
        T: Tokenizer + 'static,
    {
        let state: SelfBleuState =
            serde_json::from_str(state).map_err(|e| BleuError::InvalidState(e.to_string()))?;
        if state.version != STATE_VERSION {
            return Err(BleuError::InvalidState(format!(
                "unsupported state version {}",
                state.version
            )));
        }
        let mut session = Self::with_options(tokenizer, options)?;
        session.corpus.append_all(state.references);
        Ok(session)
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>, BleuError> {
        self.tokenizer
            .tokenize(text)
            .map_err(|source| BleuError::Tokenize {
                input: text.to_string(),
                source,
            })
    }
}

fn validated_max_order(orders: &[usize]) -> Result<usize, BleuError> {
    if orders.contains(&0) {
        return Err(BleuError::InvalidOrder(0));
    }
    orders.iter().copied().max().ok_or(BleuError::NoOrders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::{TokenizeError, WhitespaceTokenizer};

    fn session_with_orders(orders: &[usize]) -> SelfBleuReward {
        SelfBleuReward::with_options(
            WhitespaceTokenizer::default(),
            SelfBleuOptions {
                orders: Some(orders.to_vec()),
                smoothing: Some(Smoothing::None),
                ..SelfBleuOptions::default()
            },
        )
        .unwrap()
    }

    // ==================== Construction tests ====================

    #[test]
    fn test_default_schemes_and_tracked_orders() {
        let session = SelfBleuReward::new(WhitespaceTokenizer::default()).unwrap();
        assert_eq!(session.scheme_names(), vec!["3-gram", "4-gram", "6-gram"]);
        assert_eq!(session.tracked_orders(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(session.smoothing(), Smoothing::default());
    }

    #[test]
    fn test_zero_order_rejected_at_construction() {
        let result = SelfBleuReward::with_options(
            WhitespaceTokenizer::default(),
            SelfBleuOptions {
                orders: Some(vec![2, 0]),
                ..SelfBleuOptions::default()
            },
        );
        assert!(matches!(result, Err(BleuError::InvalidOrder(0))));
    }

    #[test]
    fn test_custom_schemes_derive_tracked_orders() {
        let mut schemes = HashMap::new();
        schemes.insert(
            "sparse".to_string(),
            WeightScheme::new([(2, 0.5), (5, 0.5)]).unwrap(),
        );
        let session = SelfBleuReward::with_options(
            WhitespaceTokenizer::default(),
            SelfBleuOptions {
                orders: None,
                schemes: Some(schemes),
                ..SelfBleuOptions::default()
            },
        )
        .unwrap();
        assert_eq!(session.tracked_orders(), &[2, 5]);
        assert_eq!(session.scheme_names(), vec!["sparse"]);
    }

    #[test]
    fn test_custom_scheme_outside_explicit_orders_rejected() {
        let mut schemes = HashMap::new();
        schemes.insert("wide".to_string(), WeightScheme::uniform(5).unwrap());
        let result = SelfBleuReward::with_options(
            WhitespaceTokenizer::default(),
            SelfBleuOptions {
                orders: Some(vec![2]),
                schemes: Some(schemes),
                ..SelfBleuOptions::default()
            },
        );
        assert!(matches!(
            result,
            Err(BleuError::UntrackedOrder { order, .. }) if order > 2
        ));
    }

    #[test]
    fn test_empty_scheme_table_rejected() {
        let result = SelfBleuReward::with_options(
            WhitespaceTokenizer::default(),
            SelfBleuOptions {
                schemes: Some(HashMap::new()),
                ..SelfBleuOptions::default()
            },
        );
        assert!(matches!(result, Err(BleuError::NoOrders)));
    }

    // ==================== Scoring tests ====================

    #[test]
    fn test_self_similarity_is_one() {
        let mut session = session_with_orders(&[2]);
        session.append_reference("the cat sat on the mat").unwrap();
        let matrix = session.score(&["the cat sat on the mat"]).unwrap();
        assert!((matrix["2-gram"][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unigram_closed_form_via_strings() {
        let mut session = session_with_orders(&[1]);
        session.append_reference("the cat sat").unwrap();
        let matrix = session.score(&["the cat"]).unwrap();
        let expected = (-0.5f64).exp();
        assert!((matrix["1-gram"][0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_empty_corpus_and_empty_hypothesis() {
        let session = session_with_orders(&[2]);
        let matrix = session.score(&["whatever"]).unwrap();
        assert_eq!(matrix["2-gram"], vec![0.0]);

        let mut session = session_with_orders(&[2]);
        session.append_reference("the cat").unwrap();
        let matrix = session.score(&[""]).unwrap();
        assert_eq!(matrix["2-gram"], vec![0.0]);
    }

    #[test]
    fn test_empty_batch() {
        let session = SelfBleuReward::new(WhitespaceTokenizer::default()).unwrap();
        let matrix = session.score::<&str>(&[]).unwrap();
        assert_eq!(matrix.len(), 3);
        assert!(matrix.values().all(Vec::is_empty));
    }

    #[test]
    fn test_append_many_matches_repeated_single_appends() {
        let refs = ["the cat sat", "a dog barked", "the mat lay flat"];
        let mut batch = session_with_orders(&[2]);
        batch.append_references(refs).unwrap();
        let mut single = session_with_orders(&[2]);
        for r in refs {
            single.append_reference(r).unwrap();
        }
        let hyps = ["the cat sat", "a dog sat"];
        assert_eq!(
            batch.score(&hyps).unwrap()["2-gram"],
            single.score(&hyps).unwrap()["2-gram"]
        );
    }

    #[test]
    fn test_score_with_schemes_rejects_untracked_order() {
        let mut session = session_with_orders(&[2]);
        session.append_reference("the cat").unwrap();
        let mut ad_hoc = HashMap::new();
        ad_hoc.insert("too-wide".to_string(), WeightScheme::uniform(4).unwrap());
        let err = session
            .score_with_schemes(&["the cat"], &ad_hoc)
            .unwrap_err();
        assert!(matches!(
            err,
            BleuError::UntrackedOrder { scheme, order: 4 } if scheme == "too-wide"
        ));
    }

    #[test]
    fn test_tokenizer_failure_identifies_input() {
        let tokenizer = |text: &str| -> Result<Vec<String>, TokenizeError> {
            if text.contains('\u{0}') {
                Err(TokenizeError("NUL byte in input".to_string()))
            } else {
                Ok(text.split_whitespace().map(str::to_string).collect())
            }
        };
        let mut session = SelfBleuReward::new(tokenizer).unwrap();
        session.append_reference("fine input").unwrap();
        let err = session.score(&["ok", "bad\u{0}input"]).unwrap_err();
        match err {
            BleuError::Tokenize { input, .. } => assert_eq!(input, "bad\u{0}input"),
            other => panic!("expected Tokenize error, got {other:?}"),
        }
    }

    #[test]
    fn test_reward_is_mean_across_schemes() {
        let mut session = SelfBleuReward::with_options(
            WhitespaceTokenizer::default(),
            SelfBleuOptions {
                orders: Some(vec![1, 2]),
                smoothing: Some(Smoothing::None),
                ..SelfBleuOptions::default()
            },
        )
        .unwrap();
        session.append_reference("the cat sat on the mat").unwrap();
        let hyps = ["the cat sat on the mat", "nothing shared here"];
        let matrix = session.score(&hyps).unwrap();
        let rewards = session.reward(&hyps).unwrap();
        for (i, reward) in rewards.iter().enumerate() {
            let mean = (matrix["1-gram"][i] + matrix["2-gram"][i]) / 2.0;
            assert!((reward - mean).abs() < 1e-12);
        }
        assert!((rewards[0] - 1.0).abs() < 1e-12);
        assert_eq!(rewards[1], 0.0);
    }

    // ==================== Persistence tests ====================

    #[test]
    fn test_state_round_trip_preserves_scores() {
        let mut session = SelfBleuReward::new(WhitespaceTokenizer::default()).unwrap();
        session
            .append_references(["the cat sat on the mat", "a feline rested on the rug"])
            .unwrap();
        let hyps = ["the cat is on the mat"];
        let before = session.score(&hyps).unwrap();

        let blob = session.export_state().unwrap();
        let restored = SelfBleuReward::from_state(
            WhitespaceTokenizer::default(),
            SelfBleuOptions::default(),
            &blob,
        )
        .unwrap();
        assert_eq!(restored.reference_count(), 2);
        let after = restored.score(&hyps).unwrap();
        for name in ["3-gram", "4-gram", "6-gram"] {
            assert_eq!(before[name], after[name]);
        }
    }

    #[test]
    fn test_from_state_rejects_garbage_and_bad_version() {
        let err = SelfBleuReward::from_state(
            WhitespaceTokenizer::default(),
            SelfBleuOptions::default(),
            "not json",
        )
        .unwrap_err();
        assert!(matches!(err, BleuError::InvalidState(_)));

        let blob = serde_json::to_string(&SelfBleuState {
            version: 999,
            references: Vec::new(),
        })
        .unwrap();
        let err = SelfBleuReward::from_state(
            WhitespaceTokenizer::default(),
            SelfBleuOptions::default(),
            &blob,
        )
        .unwrap_err();
        assert!(matches!(err, BleuError::InvalidState(msg) if msg.contains("999")));
    }
}
