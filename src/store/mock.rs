//! In-memory mock implementation of DocumentStore for testing.
//!
//! All collections are `tokio::sync::RwLock`-guarded maps. The messaging
//! mutations take the conversation and message locks together so the
//! atomicity contract of `append_message` / `mark_read` holds under
//! concurrent test tasks.

use super::models::*;
use super::traits::{ConversationLinks, DocumentStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory mock implementation of DocumentStore for testing.
#[derive(Default)]
pub struct MockDocumentStore {
    pub profiles: RwLock<HashMap<String, ExecutiveProfile>>,
    pub needs: RwLock<HashMap<Uuid, StartupNeed>>,
    pub applications: RwLock<HashMap<String, Application>>,
    pub saved: RwLock<HashMap<(String, Uuid), SavedOpportunity>>,
    pub shortlists: RwLock<HashMap<(String, String), ShortlistedExecutive>>,
    pub conversations: RwLock<HashMap<Uuid, Conversation>>,
    /// Uniqueness arbitration: normalized pair + channel kind → conversation.
    pub conversation_keys: RwLock<HashMap<(String, String, bool), Uuid>>,
    /// Append-only, insertion order preserved for tie-breaking.
    pub messages: RwLock<Vec<Message>>,
    pub broadcasts: RwLock<Vec<Broadcast>>,
    pub users: RwLock<HashMap<String, UserRecord>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn upsert_profile(&self, profile: &ExecutiveProfile) -> Result<()> {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<Option<ExecutiveProfile>> {
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<ExecutiveProfile>> {
        let mut profiles: Vec<_> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(profiles)
    }

    async fn upsert_need(&self, need: &StartupNeed) -> Result<()> {
        self.needs.write().await.insert(need.id, need.clone());
        Ok(())
    }

    async fn get_need(&self, id: Uuid) -> Result<Option<StartupNeed>> {
        Ok(self.needs.read().await.get(&id).cloned())
    }

    async fn list_active_needs(&self) -> Result<Vec<StartupNeed>> {
        let mut needs: Vec<_> = self
            .needs
            .read()
            .await
            .values()
            .filter(|n| n.status == NeedStatus::Active)
            .cloned()
            .collect();
        needs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(needs)
    }

    async fn list_needs_by_creator(&self, creator_id: &str) -> Result<Vec<StartupNeed>> {
        let mut needs: Vec<_> = self
            .needs
            .read()
            .await
            .values()
            .filter(|n| n.creator_id == creator_id)
            .cloned()
            .collect();
        needs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(needs)
    }

    async fn delete_need(&self, id: Uuid) -> Result<()> {
        self.needs.write().await.remove(&id);
        Ok(())
    }

    async fn insert_application_if_absent(&self, application: &Application) -> Result<bool> {
        let mut applications = self.applications.write().await;
        if applications.contains_key(&application.id) {
            return Ok(false);
        }
        applications.insert(application.id.clone(), application.clone());
        Ok(true)
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>> {
        Ok(self.applications.read().await.get(id).cloned())
    }

    async fn list_applications_for_executive(
        &self,
        executive_id: &str,
    ) -> Result<Vec<Application>> {
        let mut apps: Vec<_> = self
            .applications
            .read()
            .await
            .values()
            .filter(|a| a.executive_id == executive_id)
            .cloned()
            .collect();
        apps.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(apps)
    }

    async fn list_applications_for_need(&self, need_id: Uuid) -> Result<Vec<Application>> {
        let mut apps: Vec<_> = self
            .applications
            .read()
            .await
            .values()
            .filter(|a| a.need_id == need_id)
            .cloned()
            .collect();
        apps.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(apps)
    }

    async fn list_all_applications(&self) -> Result<Vec<Application>> {
        let mut apps: Vec<_> = self.applications.read().await.values().cloned().collect();
        apps.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(apps)
    }

    async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let mut applications = self.applications.write().await;
        Ok(applications.get_mut(id).map(|app| {
            app.status = status;
            app.updated_at = Utc::now();
            app.clone()
        }))
    }

    async fn add_saved_opportunity(&self, executive_id: &str, need_id: Uuid) -> Result<()> {
        self.saved
            .write()
            .await
            .entry((executive_id.to_string(), need_id))
            .or_insert_with(|| SavedOpportunity {
                executive_id: executive_id.to_string(),
                need_id,
                saved_at: Utc::now(),
            });
        Ok(())
    }

    async fn remove_saved_opportunity(&self, executive_id: &str, need_id: Uuid) -> Result<()> {
        self.saved
            .write()
            .await
            .remove(&(executive_id.to_string(), need_id));
        Ok(())
    }

    async fn list_saved_opportunities(
        &self,
        executive_id: &str,
    ) -> Result<Vec<SavedOpportunity>> {
        Ok(self
            .saved
            .read()
            .await
            .values()
            .filter(|s| s.executive_id == executive_id)
            .cloned()
            .collect())
    }

    async fn add_shortlisted_executive(
        &self,
        startup_id: &str,
        executive_id: &str,
    ) -> Result<()> {
        self.shortlists
            .write()
            .await
            .entry((startup_id.to_string(), executive_id.to_string()))
            .or_insert_with(|| ShortlistedExecutive {
                startup_id: startup_id.to_string(),
                executive_id: executive_id.to_string(),
                shortlisted_at: Utc::now(),
            });
        Ok(())
    }

    async fn remove_shortlisted_executive(
        &self,
        startup_id: &str,
        executive_id: &str,
    ) -> Result<()> {
        self.shortlists
            .write()
            .await
            .remove(&(startup_id.to_string(), executive_id.to_string()));
        Ok(())
    }

    async fn list_shortlisted_executives(
        &self,
        startup_id: &str,
    ) -> Result<Vec<ShortlistedExecutive>> {
        Ok(self
            .shortlists
            .read()
            .await
            .values()
            .filter(|s| s.startup_id == startup_id)
            .cloned()
            .collect())
    }

    async fn list_all_shortlists(&self) -> Result<Vec<ShortlistedExecutive>> {
        Ok(self.shortlists.read().await.values().cloned().collect())
    }

    async fn find_or_create_conversation(
        &self,
        user_a: &str,
        user_b: &str,
        kind: ChannelKind,
        links: ConversationLinks,
    ) -> Result<Conversation> {
        let (lo, hi) = Conversation::normalize_pair(user_a, user_b);
        let key = (lo.clone(), hi.clone(), kind.is_support());

        let mut keys = self.conversation_keys.write().await;
        let mut conversations = self.conversations.write().await;

        if let Some(id) = keys.get(&key) {
            return Ok(conversations
                .get(id)
                .cloned()
                .context("conversation key points at a missing document")?);
        }

        let mut unread_counts = HashMap::new();
        unread_counts.insert(lo.clone(), 0);
        unread_counts.insert(hi.clone(), 0);
        let conv = Conversation {
            id: Uuid::new_v4(),
            participants: [lo, hi],
            is_support_channel: kind.is_support(),
            startup_id: links.startup_id,
            executive_id: links.executive_id,
            need_id: links.need_id,
            unread_counts,
            last_message_text: None,
            last_message_at: None,
            last_message_sender_id: None,
            created_at: Utc::now(),
        };
        keys.insert(key, conv.id);
        conversations.insert(conv.id, conv.clone());
        Ok(conv)
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(&id).cloned())
    }

    async fn conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect())
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> Result<Message> {
        // Both locks held for the whole mutation: the five effects are
        // observable only together.
        let mut conversations = self.conversations.write().await;
        let mut messages = self.messages.write().await;

        let conv = conversations
            .get_mut(&conversation_id)
            .context("conversation not found")?;
        let recipient = conv
            .other_participant(sender_id)
            .context("sender is not a participant of the conversation")?
            .to_string();

        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            created_at: now,
            is_read_by_recipient: false,
            is_broadcast: false,
            status: "delivered".to_string(),
        };
        messages.push(message.clone());

        conv.unread_counts.insert(sender_id.to_string(), 0);
        *conv.unread_counts.entry(recipient).or_insert(0) += 1;
        conv.last_message_text = Some(message_preview(text));
        conv.last_message_at = Some(now);
        conv.last_message_sender_id = Some(sender_id.to_string());

        Ok(message)
    }

    async fn mark_read(&self, conversation_id: Uuid, user_id: &str) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        let mut messages = self.messages.write().await;

        let conv = conversations
            .get_mut(&conversation_id)
            .context("conversation not found")?;
        if !conv.has_participant(user_id) {
            anyhow::bail!("user is not a participant of the conversation");
        }

        conv.unread_counts.insert(user_id.to_string(), 0);
        for msg in messages
            .iter_mut()
            .filter(|m| m.conversation_id == conversation_id)
        {
            if msg.sender_id != user_id && !msg.is_read_by_recipient {
                msg.is_read_by_recipient = true;
            }
        }
        Ok(())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let mut result: Vec<_> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order on created_at ties.
        result.sort_by_key(|m| m.created_at);
        Ok(result)
    }

    async fn create_broadcast(&self, broadcast: &Broadcast) -> Result<()> {
        self.broadcasts.write().await.push(broadcast.clone());
        Ok(())
    }

    async fn list_broadcasts(&self) -> Result<Vec<Broadcast>> {
        let mut broadcasts = self.broadcasts.read().await.clone();
        broadcasts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(broadcasts)
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        self.users.write().await.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRecord>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let mut users: Vec<_> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<UserRecord>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            user.role = Some(role);
            user.clone()
        }))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
