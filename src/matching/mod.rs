//! Bidirectional compatibility matching between executives and roles

pub mod engine;
pub mod text;

pub use engine::{MatchEngine, RankedExecutive, RankedNeed};
pub use text::{executive_profile_text, startup_need_text};
