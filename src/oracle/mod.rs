//! Compatibility scoring oracle
//!
//! Architecture follows the project pattern (trait + impl + mock):
//! - `ScoringOracle` trait: async interface for pairwise scoring
//! - `HttpScoringOracle`: real implementation over an OpenAI-compatible
//!   chat-completions endpoint
//! - `MockScoringOracle`: deterministic term-overlap mock for tests

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpScoringOracle;
pub use mock::MockScoringOracle;
pub use traits::{MatchSignal, ScoringOracle};
