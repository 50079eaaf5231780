//! Deterministic mock scoring oracle for tests.
//!
//! Scores by term overlap between the two text blocks so tests get a
//! meaningful, reproducible ranking without a network call. Can be pinned
//! to a fixed score or armed to fail on a marker token to exercise batch
//! failure paths.

use super::traits::{MatchSignal, ScoringOracle};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct MockScoringOracle {
    fixed_score: Option<f64>,
    fail_marker: Option<String>,
    calls: AtomicUsize,
}

impl MockScoringOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return this score, regardless of inputs.
    pub fn with_fixed_score(score: f64) -> Self {
        Self {
            fixed_score: Some(score),
            ..Self::default()
        }
    }

    /// Fail with `OracleUnavailable` whenever either text contains the
    /// marker. Other pairs score normally.
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    /// Number of scoring calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn terms(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Overlap coefficient of the two term sets, in [0, 1].
    fn overlap_score(profile_text: &str, need_text: &str) -> f64 {
        let a = Self::terms(profile_text);
        let b = Self::terms(need_text);
        let smaller = a.len().min(b.len());
        if smaller == 0 {
            return 0.0;
        }
        let shared = a.intersection(&b).count();
        shared as f64 / smaller as f64
    }
}

#[async_trait]
impl ScoringOracle for MockScoringOracle {
    async fn score(&self, profile_text: &str, need_text: &str) -> Result<MatchSignal> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ref marker) = self.fail_marker {
            if profile_text.contains(marker) || need_text.contains(marker) {
                return Err(MarketError::OracleUnavailable(
                    "mock oracle armed to fail".to_string(),
                ));
            }
        }

        let score = self
            .fixed_score
            .unwrap_or_else(|| Self::overlap_score(profile_text, need_text));
        Ok(MatchSignal {
            score: score.clamp(0.0, 1.0),
            rationale: format!("term overlap score {:.2}", score),
            recommendation: "mock recommendation".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-oracle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_overlap_score_rewards_shared_terms() {
        let oracle = MockScoringOracle::new();
        let strong = oracle
            .score("finance fundraising saas", "finance fundraising saas metrics")
            .await
            .unwrap();
        let weak = oracle
            .score("marketing branding", "finance fundraising saas metrics")
            .await
            .unwrap();
        assert!(strong.score > weak.score);
        assert!(strong.score <= 1.0 && weak.score >= 0.0);
        assert_eq!(oracle.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_marker_triggers_unavailable() {
        let oracle = MockScoringOracle::failing_on("poison");
        assert!(oracle.score("fine", "fine too").await.is_ok());
        let err = oracle.score("poison pill", "fine").await.unwrap_err();
        assert!(matches!(err, MarketError::OracleUnavailable(_)));
    }
}
