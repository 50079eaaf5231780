//! Test helper factories
//!
//! Convenience functions for creating test documents with sensible
//! defaults. Engines under test combine these with the in-memory mock
//! store and the deterministic mock oracle.
#![allow(dead_code)]

use crate::store::models::*;
use chrono::Utc;
use uuid::Uuid;

/// Create a test executive profile. The expertise text doubles as the
/// signal the mock oracle scores against, so tests pick their words
/// deliberately.
pub fn test_profile(id: &str, expertise: &str) -> ExecutiveProfile {
    let now = Utc::now();
    ExecutiveProfile {
        id: id.to_string(),
        name: format!("Exec {}", id),
        expertise: expertise.to_string(),
        industry_experience: vec!["saas".to_string()],
        key_accomplishments: vec!["Scaled an org from 5 to 50".to_string()],
        availability: Availability::Fractional,
        compensation: "$200/hr".to_string(),
        location: "Remote".to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Create a test need with sensible defaults (active, finance-flavored).
pub fn test_need(id: Uuid, creator_id: &str) -> StartupNeed {
    let now = Utc::now();
    StartupNeed {
        id,
        creator_id: creator_id.to_string(),
        company_name: "Test Startup".to_string(),
        role_summary: "Fractional CFO".to_string(),
        key_deliverables: "Own the financial model".to_string(),
        key_challenges: "Series A preparation".to_string(),
        required_expertise: vec!["finance".to_string()],
        budget: "$8k/mo".to_string(),
        stage: "seed".to_string(),
        status: NeedStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

/// Create a test user without a role claim.
pub fn test_user(id: &str, avatar_url: Option<&str>) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        display_name: format!("{} name", id),
        email: format!("{}@example.com", id),
        role: None,
        avatar_url: avatar_url.map(|s| s.to_string()),
        created_at: Utc::now(),
    }
}

/// Create a test user with a role claim.
pub fn test_user_with_role(id: &str, role: Role) -> UserRecord {
    UserRecord {
        role: Some(role),
        ..test_user(id, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories_produce_valid_documents() {
        let profile = test_profile("exec-1", "finance");
        assert_eq!(profile.id, "exec-1");
        assert!(!profile.name.is_empty());

        let need = test_need(Uuid::new_v4(), "startup-1");
        assert_eq!(need.status, NeedStatus::Active);
        assert!(!need.required_expertise.is_empty());

        let admin = test_user_with_role("admin-1", Role::Admin);
        assert_eq!(admin.role, Some(Role::Admin));
    }
}
