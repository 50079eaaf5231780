//! ScoringOracle trait definition
//!
//! The oracle is an external text-generation service treated as a black
//! box: it receives two flattened, human-readable text blocks and returns
//! a compatibility signal. Implementations must be thread-safe
//! (`Send + Sync`) for `Arc<dyn ScoringOracle>` usage.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Compatibility signal for one (executive, role) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSignal {
    /// Always within [0, 1]; implementations clamp before returning.
    pub score: f64,
    pub rationale: String,
    pub recommendation: String,
}

/// Abstract interface for compatibility scoring.
///
/// # Implementations
///
/// - [`HttpScoringOracle`](super::HttpScoringOracle): HTTP client for an
///   OpenAI-compatible chat-completions endpoint
/// - [`MockScoringOracle`](super::MockScoringOracle): deterministic mock
///   scoring by term overlap (for tests)
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Score one candidate pair.
    ///
    /// # Errors
    ///
    /// Timeouts, overload responses and malformed completions surface as
    /// [`MarketError::OracleUnavailable`](crate::error::MarketError) so
    /// callers can present a retry-suggesting message.
    async fn score(&self, profile_text: &str, need_text: &str) -> Result<MatchSignal>;

    /// The model identifier used, for traceability in logs.
    fn model_name(&self) -> &str;
}
