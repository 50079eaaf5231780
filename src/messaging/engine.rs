//! Conversation & Messaging Engine
//!
//! Sends messages through the store's transactional append, tracks unread
//! counters, merges broadcasts into inboxes as read-only pseudo
//! conversations, and routes support threads to the configured platform
//! support identity.

use crate::error::{MarketError, Result};
use crate::store::models::*;
use crate::store::{ConversationLinks, DocumentStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Synthetic-id prefix under which broadcasts appear in inboxes.
pub const BROADCAST_ID_PREFIX: &str = "broadcast_";

/// The reserved platform-support identity, injected at startup. Any human
/// admin replying from the inbox impersonates this identity, so all
/// support conversations funnel to one participant slot.
#[derive(Debug, Clone)]
pub struct SupportIdentity {
    pub user_id: String,
    pub display_name: String,
}

impl Default for SupportIdentity {
    fn default() -> Self {
        Self {
            user_id: "platform-support".to_string(),
            display_name: "Platform Support".to_string(),
        }
    }
}

/// One entry of a user's inbox: either a real conversation annotated with
/// the counterpart's identity, or a broadcast synthesized into
/// conversation shape.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    /// Conversation uuid, or `broadcast_{id}` for broadcasts.
    pub id: String,
    pub counterpart_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart_avatar: Option<String>,
    pub is_support_channel: bool,
    pub is_broadcast: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_text: Option<String>,
    pub last_message_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_sender_id: Option<String>,
    pub unread_count: u32,
}

pub struct MessagingEngine {
    store: Arc<dyn DocumentStore>,
    support: SupportIdentity,
}

impl MessagingEngine {
    pub fn new(store: Arc<dyn DocumentStore>, support: SupportIdentity) -> Self {
        Self { store, support }
    }

    pub fn support_identity(&self) -> &SupportIdentity {
        &self.support
    }

    fn parse_conversation_id(raw: &str) -> Result<Uuid> {
        Uuid::parse_str(raw)
            .map_err(|_| MarketError::InvalidInput(format!("invalid conversation id: {}", raw)))
    }

    /// Find or create the single conversation for an unordered participant
    /// pair and channel kind. Uniqueness is arbitrated by the store, so
    /// concurrent first-contact from both sides converges on one document.
    pub async fn start_or_get_conversation(
        &self,
        user_a: &str,
        user_b: &str,
        kind: ChannelKind,
        links: ConversationLinks,
    ) -> Result<Conversation> {
        if user_a.is_empty() || user_b.is_empty() {
            return Err(MarketError::InvalidInput(
                "participant ids must be non-empty".to_string(),
            ));
        }
        if user_a == user_b {
            return Err(MarketError::InvalidInput(
                "cannot start a conversation with yourself".to_string(),
            ));
        }
        Ok(self
            .store
            .find_or_create_conversation(user_a, user_b, kind, links)
            .await?)
    }

    /// Send a message. The message append, both unread-counter updates and
    /// the last-message summary land in one store transaction; on error
    /// nothing is persisted.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        text: &str,
    ) -> Result<Message> {
        if conversation_id.starts_with(BROADCAST_ID_PREFIX) {
            return Err(MarketError::InvalidInput(
                "broadcasts do not accept replies; contact support instead".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(MarketError::InvalidInput(
                "message text must be non-empty".to_string(),
            ));
        }
        let id = Self::parse_conversation_id(conversation_id)?;
        let conversation = self
            .store
            .get_conversation(id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("conversation {}", id)))?;
        if !conversation.has_participant(sender_id) {
            return Err(MarketError::Unauthorized);
        }

        let message = self.store.append_message(id, sender_id, text).await?;
        tracing::debug!(conversation_id = %id, sender = sender_id, "message delivered");
        Ok(message)
    }

    /// Mark every message from the other participant as read and zero the
    /// caller's unread counter, atomically. Broadcast pseudo-conversations
    /// are always considered read and trivially succeed.
    pub async fn mark_conversation_as_read(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<()> {
        if conversation_id.starts_with(BROADCAST_ID_PREFIX) {
            return Ok(());
        }
        let id = Self::parse_conversation_id(conversation_id)?;
        let conversation = self
            .store
            .get_conversation(id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("conversation {}", id)))?;
        if !conversation.has_participant(user_id) {
            return Err(MarketError::Unauthorized);
        }
        Ok(self.store.mark_read(id, user_id).await?)
    }

    /// The user's inbox: real conversations annotated with counterpart
    /// identity, concatenated with every broadcast as a read-only entry,
    /// sorted by last activity descending. Broadcasts never displace or
    /// deduplicate with real conversations.
    pub async fn get_conversations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>> {
        let conversations = self.store.conversations_for_user(user_id).await?;

        let counterpart_ids: Vec<String> = conversations
            .iter()
            .filter_map(|c| c.other_participant(user_id))
            .filter(|id| *id != self.support.user_id)
            .map(|id| id.to_string())
            .collect();
        let users: HashMap<String, UserRecord> = self
            .store
            .get_users_by_ids(&counterpart_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut summaries: Vec<ConversationSummary> = conversations
            .into_iter()
            .map(|conv| {
                let other = conv.other_participant(user_id).unwrap_or_default();
                let (name, avatar) = if other == self.support.user_id {
                    (self.support.display_name.clone(), None)
                } else {
                    match users.get(other) {
                        Some(user) => (user.display_name.clone(), user.avatar_url.clone()),
                        // Deleted or never-onboarded counterpart: fall back
                        // to the raw id rather than dropping the thread.
                        None => (other.to_string(), None),
                    }
                };
                let unread_count = conv.unread_for(user_id);
                ConversationSummary {
                    id: conv.id.to_string(),
                    counterpart_name: name,
                    counterpart_avatar: avatar,
                    is_support_channel: conv.is_support_channel,
                    is_broadcast: false,
                    last_message_at: conv.last_message_at.unwrap_or(conv.created_at),
                    last_message_text: conv.last_message_text,
                    last_message_sender_id: conv.last_message_sender_id,
                    unread_count,
                }
            })
            .collect();

        for broadcast in self.store.list_broadcasts().await? {
            summaries.push(ConversationSummary {
                id: broadcast.synthetic_conversation_id(),
                counterpart_name: self.support.display_name.clone(),
                counterpart_avatar: None,
                is_support_channel: false,
                is_broadcast: true,
                last_message_at: broadcast.created_at,
                last_message_text: Some(message_preview(&broadcast.text)),
                last_message_sender_id: Some(broadcast.sender_id),
                unread_count: 0,
            });
        }

        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(summaries)
    }

    /// Total unread messages across the user's conversations. Skips
    /// conversations whose last message the user sent themselves; the
    /// send-side reset already keeps that counter at zero, this is a
    /// second line of defense. Broadcasts never contribute.
    pub async fn get_unread_message_count(&self, user_id: &str) -> Result<u32> {
        let conversations = self.store.conversations_for_user(user_id).await?;
        Ok(conversations
            .iter()
            .filter(|c| c.last_message_sender_id.as_deref() != Some(user_id))
            .map(|c| c.unread_for(user_id))
            .sum())
    }

    /// Messages of a conversation, oldest first. The caller must be a
    /// participant.
    pub async fn get_messages(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<Message>> {
        let id = Self::parse_conversation_id(conversation_id)?;
        let conversation = self
            .store
            .get_conversation(id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("conversation {}", id)))?;
        if !conversation.has_participant(user_id) {
            return Err(MarketError::Unauthorized);
        }
        Ok(self.store.list_messages(id).await?)
    }

    /// Open (or reuse) the caller's support thread, optionally sending an
    /// initial message in the same call. Unauthenticated contact
    /// submissions pass `None` for the user id and get a synthesized guest
    /// identity.
    pub async fn start_or_get_admin_conversation(
        &self,
        user_id: Option<&str>,
        initial_message: Option<&str>,
        guest_name: Option<&str>,
    ) -> Result<Conversation> {
        let user_id = match user_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let guest_id = format!("guest_{}", Uuid::new_v4());
                self.store
                    .upsert_user(&UserRecord {
                        id: guest_id.clone(),
                        display_name: guest_name.unwrap_or("Guest").to_string(),
                        email: String::new(),
                        role: None,
                        avatar_url: None,
                        created_at: Utc::now(),
                    })
                    .await?;
                guest_id
            }
        };

        let conversation = self
            .start_or_get_conversation(
                &user_id,
                &self.support.user_id,
                ChannelKind::Support,
                ConversationLinks::default(),
            )
            .await?;

        if let Some(text) = initial_message {
            self.send_message(&conversation.id.to_string(), &user_id, text)
                .await?;
            // Re-read so the returned document carries the message summary.
            return Ok(self
                .store
                .get_conversation(conversation.id)
                .await?
                .ok_or_else(|| {
                    MarketError::NotFound(format!("conversation {}", conversation.id))
                })?);
        }
        Ok(conversation)
    }

    /// Write one platform-wide announcement. Requires the Admin role,
    /// re-verified against the identity directory; a client-supplied role
    /// is never trusted. Touches no conversation counters.
    pub async fn broadcast_message_to_all_users(
        &self,
        admin_id: &str,
        text: &str,
    ) -> Result<Broadcast> {
        if text.trim().is_empty() {
            return Err(MarketError::InvalidInput(
                "broadcast text must be non-empty".to_string(),
            ));
        }
        crate::auth::ensure_admin(self.store.as_ref(), admin_id).await?;

        let broadcast = Broadcast {
            id: Uuid::new_v4(),
            sender_id: admin_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_broadcast(&broadcast).await?;
        tracing::info!(broadcast_id = %broadcast.id, "broadcast published");
        Ok(broadcast)
    }
}
