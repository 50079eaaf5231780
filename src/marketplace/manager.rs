//! Marketplace manager: profiles, needs, applications, saved sets
//!
//! The thin collaborators around the two engines: owner-gated document
//! writes, the at-most-one application rule, toggle relations and the
//! admin console listings. Status updates can notify the executive by
//! sending a message through the Messaging Engine.

use crate::auth::ensure_admin;
use crate::error::{MarketError, Result};
use crate::messaging::MessagingEngine;
use crate::store::models::*;
use crate::store::{ConversationLinks, DocumentStore};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Editable profile fields, as submitted by the owning executive.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDraft {
    pub name: String,
    pub expertise: String,
    #[serde(default)]
    pub industry_experience: Vec<String>,
    #[serde(default)]
    pub key_accomplishments: Vec<String>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub compensation: String,
    #[serde(default)]
    pub location: String,
}

/// Editable need fields, as submitted by the owning startup.
#[derive(Debug, Clone, Deserialize)]
pub struct NeedDraft {
    #[serde(default)]
    pub company_name: String,
    pub role_summary: String,
    #[serde(default)]
    pub key_deliverables: String,
    #[serde(default)]
    pub key_challenges: String,
    #[serde(default)]
    pub required_expertise: Vec<String>,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub stage: String,
}

pub struct MarketplaceManager {
    store: Arc<dyn DocumentStore>,
    messaging: Arc<MessagingEngine>,
}

impl MarketplaceManager {
    pub fn new(store: Arc<dyn DocumentStore>, messaging: Arc<MessagingEngine>) -> Self {
        Self { store, messaging }
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    /// Create or update the caller's own profile. `created_at` survives
    /// re-saves; `updated_at` is bumped on every save.
    pub async fn save_profile(
        &self,
        caller_id: &str,
        draft: ProfileDraft,
    ) -> Result<ExecutiveProfile> {
        if draft.name.trim().is_empty() || draft.expertise.trim().is_empty() {
            return Err(MarketError::InvalidInput(
                "name and expertise are required".to_string(),
            ));
        }
        let now = Utc::now();
        let created_at = match self.store.get_profile(caller_id).await? {
            Some(existing) => existing.created_at,
            None => now,
        };
        let profile = ExecutiveProfile {
            id: caller_id.to_string(),
            name: draft.name,
            expertise: draft.expertise,
            industry_experience: draft.industry_experience,
            key_accomplishments: draft.key_accomplishments,
            availability: draft.availability,
            compensation: draft.compensation,
            location: draft.location,
            created_at,
            updated_at: now,
        };
        self.store.upsert_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn get_profile(&self, id: &str) -> Result<ExecutiveProfile> {
        self.store
            .get_profile(id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("profile {}", id)))
    }

    // ========================================================================
    // Needs
    // ========================================================================

    pub async fn create_need(&self, caller_id: &str, draft: NeedDraft) -> Result<StartupNeed> {
        if draft.role_summary.trim().is_empty() {
            return Err(MarketError::InvalidInput(
                "role summary is required".to_string(),
            ));
        }
        let now = Utc::now();
        let need = StartupNeed {
            id: Uuid::new_v4(),
            creator_id: caller_id.to_string(),
            company_name: draft.company_name,
            role_summary: draft.role_summary,
            key_deliverables: draft.key_deliverables,
            key_challenges: draft.key_challenges,
            required_expertise: draft.required_expertise,
            budget: draft.budget,
            stage: draft.stage,
            status: NeedStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert_need(&need).await?;
        Ok(need)
    }

    /// Owner-only edit; every edit bumps `updated_at`.
    pub async fn update_need(
        &self,
        caller_id: &str,
        need_id: Uuid,
        draft: NeedDraft,
    ) -> Result<StartupNeed> {
        let mut need = self.owned_need(caller_id, need_id).await?;
        need.company_name = draft.company_name;
        need.role_summary = draft.role_summary;
        need.key_deliverables = draft.key_deliverables;
        need.key_challenges = draft.key_challenges;
        need.required_expertise = draft.required_expertise;
        need.budget = draft.budget;
        need.stage = draft.stage;
        need.updated_at = Utc::now();
        self.store.upsert_need(&need).await?;
        Ok(need)
    }

    /// Soft delete / reactivate. Inactive needs drop out of matching.
    pub async fn set_need_status(
        &self,
        caller_id: &str,
        need_id: Uuid,
        status: NeedStatus,
    ) -> Result<StartupNeed> {
        let mut need = self.owned_need(caller_id, need_id).await?;
        need.status = status;
        need.updated_at = Utc::now();
        self.store.upsert_need(&need).await?;
        Ok(need)
    }

    pub async fn delete_need(&self, caller_id: &str, need_id: Uuid) -> Result<()> {
        self.owned_need(caller_id, need_id).await?;
        Ok(self.store.delete_need(need_id).await?)
    }

    pub async fn list_needs_for_startup(&self, creator_id: &str) -> Result<Vec<StartupNeed>> {
        Ok(self.store.list_needs_by_creator(creator_id).await?)
    }

    async fn owned_need(&self, caller_id: &str, need_id: Uuid) -> Result<StartupNeed> {
        let need = self
            .store
            .get_need(need_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("need {}", need_id)))?;
        if need.creator_id != caller_id {
            return Err(MarketError::Unauthorized);
        }
        Ok(need)
    }

    // ========================================================================
    // Applications
    // ========================================================================

    /// Apply to a need. At most one application per (executive, need);
    /// the second attempt is a Conflict and leaves the original untouched.
    pub async fn apply(&self, executive_id: &str, need_id: Uuid) -> Result<Application> {
        let need = self
            .store
            .get_need(need_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("need {}", need_id)))?;
        if need.status != NeedStatus::Active {
            return Err(MarketError::InvalidInput(
                "this role is no longer accepting applications".to_string(),
            ));
        }

        let application = Application::new(executive_id, need_id);
        if !self.store.insert_application_if_absent(&application).await? {
            return Err(MarketError::Conflict("already applied".to_string()));
        }
        tracing::info!(executive = executive_id, need = %need_id, "application submitted");
        Ok(application)
    }

    /// Update an application's pipeline status. Only the need's owner may
    /// do this. With `notify`, the executive gets a status-change message
    /// through their direct conversation with the startup (created on
    /// first use).
    pub async fn update_application_status(
        &self,
        caller_id: &str,
        application_id: &str,
        status: ApplicationStatus,
        notify: bool,
    ) -> Result<Application> {
        let application = self
            .store
            .get_application(application_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("application {}", application_id)))?;
        let need = self
            .store
            .get_need(application.need_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("need {}", application.need_id)))?;
        if need.creator_id != caller_id {
            return Err(MarketError::Unauthorized);
        }

        let updated = self
            .store
            .set_application_status(application_id, status)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("application {}", application_id)))?;

        if notify {
            let conversation = self
                .messaging
                .start_or_get_conversation(
                    caller_id,
                    &application.executive_id,
                    ChannelKind::Direct,
                    ConversationLinks {
                        startup_id: Some(caller_id.to_string()),
                        executive_id: Some(application.executive_id.clone()),
                        need_id: Some(need.id),
                    },
                )
                .await?;
            self.messaging
                .send_message(
                    &conversation.id.to_string(),
                    caller_id,
                    &format!(
                        "Your application for \"{}\" is now {}.",
                        need.role_summary, status
                    ),
                )
                .await?;
        }

        Ok(updated)
    }

    pub async fn list_applications_for_need(
        &self,
        caller_id: &str,
        need_id: Uuid,
    ) -> Result<Vec<Application>> {
        self.owned_need(caller_id, need_id).await?;
        Ok(self.store.list_applications_for_need(need_id).await?)
    }

    // ========================================================================
    // Saved opportunities / shortlists
    // ========================================================================

    /// Toggle set membership; returns the new saved state. A toggle pair
    /// with alternating `currently_saved` is a round-trip no-op.
    pub async fn toggle_save_opportunity(
        &self,
        executive_id: &str,
        need_id: Uuid,
        currently_saved: bool,
    ) -> Result<bool> {
        if currently_saved {
            self.store
                .remove_saved_opportunity(executive_id, need_id)
                .await?;
            Ok(false)
        } else {
            self.store
                .add_saved_opportunity(executive_id, need_id)
                .await?;
            Ok(true)
        }
    }

    /// Toggle shortlist membership; returns the new shortlisted state.
    pub async fn toggle_shortlist(
        &self,
        startup_id: &str,
        executive_id: &str,
        currently_shortlisted: bool,
    ) -> Result<bool> {
        if currently_shortlisted {
            self.store
                .remove_shortlisted_executive(startup_id, executive_id)
                .await?;
            Ok(false)
        } else {
            self.store
                .add_shortlisted_executive(startup_id, executive_id)
                .await?;
            Ok(true)
        }
    }

    pub async fn list_saved_opportunities(
        &self,
        executive_id: &str,
    ) -> Result<Vec<SavedOpportunity>> {
        Ok(self.store.list_saved_opportunities(executive_id).await?)
    }

    pub async fn list_shortlist(&self, startup_id: &str) -> Result<Vec<ShortlistedExecutive>> {
        Ok(self.store.list_shortlisted_executives(startup_id).await?)
    }

    // ========================================================================
    // Admin console
    // ========================================================================

    pub async fn admin_list_users(&self, admin_id: &str) -> Result<Vec<UserRecord>> {
        ensure_admin(self.store.as_ref(), admin_id).await?;
        Ok(self.store.list_users().await?)
    }

    pub async fn admin_list_applications(&self, admin_id: &str) -> Result<Vec<Application>> {
        ensure_admin(self.store.as_ref(), admin_id).await?;
        Ok(self.store.list_all_applications().await?)
    }

    /// Every shortlist entry across every startup.
    pub async fn admin_list_shortlists(
        &self,
        admin_id: &str,
    ) -> Result<Vec<ShortlistedExecutive>> {
        ensure_admin(self.store.as_ref(), admin_id).await?;
        Ok(self.store.list_all_shortlists().await?)
    }

    pub async fn admin_set_user_role(
        &self,
        admin_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<UserRecord> {
        ensure_admin(self.store.as_ref(), admin_id).await?;
        self.store
            .set_user_role(user_id, role)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("user {}", user_id)))
    }
}
