//! Conversations, messages, broadcasts and the support channel

pub mod engine;

pub use engine::{
    ConversationSummary, MessagingEngine, SupportIdentity, BROADCAST_ID_PREFIX,
};
