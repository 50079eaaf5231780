//! Trait abstraction for document store operations
//!
//! Every persistence read/write in the engines goes through this trait so
//! tests can run against the in-memory mock. Unread counters and message
//! read-flags are mutated exclusively through `append_message` / `mark_read`,
//! which implementations must execute as a single atomic unit.

use super::models::*;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Optional denormalized links attached to a conversation on creation.
#[derive(Debug, Clone, Default)]
pub struct ConversationLinks {
    pub startup_id: Option<String>,
    pub executive_id: Option<String>,
    pub need_id: Option<Uuid>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ========================================================================
    // Executive profiles
    // ========================================================================

    /// Create or replace a profile (owner-only write path; last write wins).
    async fn upsert_profile(&self, profile: &ExecutiveProfile) -> Result<()>;

    async fn get_profile(&self, id: &str) -> Result<Option<ExecutiveProfile>>;

    /// Every executive profile in the system, no pagination.
    async fn list_profiles(&self) -> Result<Vec<ExecutiveProfile>>;

    // ========================================================================
    // Startup needs
    // ========================================================================

    async fn upsert_need(&self, need: &StartupNeed) -> Result<()>;

    async fn get_need(&self, id: Uuid) -> Result<Option<StartupNeed>>;

    /// All needs with status Active, across all startups.
    async fn list_active_needs(&self) -> Result<Vec<StartupNeed>>;

    /// All needs owned by a startup, any status.
    async fn list_needs_by_creator(&self, creator_id: &str) -> Result<Vec<StartupNeed>>;

    async fn delete_need(&self, id: Uuid) -> Result<()>;

    // ========================================================================
    // Applications
    // ========================================================================

    /// Conditional insert keyed by the composite id. Returns false without
    /// modifying anything when an application for the pair already exists.
    async fn insert_application_if_absent(&self, application: &Application) -> Result<bool>;

    async fn get_application(&self, id: &str) -> Result<Option<Application>>;

    async fn list_applications_for_executive(
        &self,
        executive_id: &str,
    ) -> Result<Vec<Application>>;

    async fn list_applications_for_need(&self, need_id: Uuid) -> Result<Vec<Application>>;

    /// Admin view across all executives and needs.
    async fn list_all_applications(&self) -> Result<Vec<Application>>;

    /// Update the pipeline status, bumping `updated_at` but never
    /// `applied_at`. Returns the updated document, or None if absent.
    async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Option<Application>>;

    // ========================================================================
    // Saved opportunities / shortlists (toggle semantics)
    // ========================================================================

    async fn add_saved_opportunity(&self, executive_id: &str, need_id: Uuid) -> Result<()>;

    async fn remove_saved_opportunity(&self, executive_id: &str, need_id: Uuid) -> Result<()>;

    async fn list_saved_opportunities(&self, executive_id: &str)
        -> Result<Vec<SavedOpportunity>>;

    async fn add_shortlisted_executive(
        &self,
        startup_id: &str,
        executive_id: &str,
    ) -> Result<()>;

    async fn remove_shortlisted_executive(
        &self,
        startup_id: &str,
        executive_id: &str,
    ) -> Result<()>;

    async fn list_shortlisted_executives(
        &self,
        startup_id: &str,
    ) -> Result<Vec<ShortlistedExecutive>>;

    /// Collection-group style scan: every shortlist entry across all
    /// startups (admin view).
    async fn list_all_shortlists(&self) -> Result<Vec<ShortlistedExecutive>>;

    // ========================================================================
    // Conversations and messages
    // ========================================================================

    /// Find-or-create arbitrated by the store: the normalized participant
    /// pair plus channel kind is a unique key, so concurrent first-contact
    /// from both sides converges on one conversation document.
    async fn find_or_create_conversation(
        &self,
        user_a: &str,
        user_b: &str,
        kind: ChannelKind,
        links: ConversationLinks,
    ) -> Result<Conversation>;

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>>;

    /// All conversations where the user is a participant.
    async fn conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>>;

    /// Append a message and update conversation state in one atomic unit:
    /// message written (`is_read_by_recipient=false`, status delivered),
    /// sender's unread counter reset to 0, recipient's incremented by 1,
    /// and the last-message summary (preview/at/sender) replaced. Partial
    /// application is never observable; on error nothing is persisted.
    ///
    /// Fails if the conversation is absent or the sender is not one of its
    /// participants.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> Result<Message>;

    /// Atomic read batch: zero `user_id`'s unread counter and flip
    /// `is_read_by_recipient=true` on every unread message sent by the
    /// other participant. A concurrent `append_message` is serialized
    /// against this batch by the store, so it cannot be un-marked.
    async fn mark_read(&self, conversation_id: Uuid, user_id: &str) -> Result<()>;

    /// Messages ordered by `created_at` ascending, insertion order on ties.
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>>;

    // ========================================================================
    // Broadcasts
    // ========================================================================

    async fn create_broadcast(&self, broadcast: &Broadcast) -> Result<()>;

    async fn list_broadcasts(&self) -> Result<Vec<Broadcast>>;

    // ========================================================================
    // Identity directory
    // ========================================================================

    async fn upsert_user(&self, user: &UserRecord) -> Result<()>;

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>>;

    /// Multi-id lookup, chunked internally at the provider batch cap
    /// ([`ID_LOOKUP_BATCH_SIZE`]). Unknown ids are silently skipped.
    async fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRecord>>;

    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Set the role custom claim. Returns the updated record, or None if
    /// the user is unknown.
    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<UserRecord>>;

    // ========================================================================
    // Health
    // ========================================================================

    async fn health_check(&self) -> Result<bool>;
}
