//! Flattened text blocks for the scoring oracle
//!
//! The oracle receives natural-language text, not structured JSON, and was
//! tuned against this exact concatenation format. Field order and labels
//! are part of the contract: change them and scoring quality degrades
//! even though nothing "breaks".

use crate::store::models::{ExecutiveProfile, StartupNeed};
use std::fmt::Write;

/// Executive block: name, expertise, industries, availability,
/// compensation, accomplishments, in that order.
pub fn executive_profile_text(profile: &ExecutiveProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name: {}", profile.name);
    let _ = writeln!(out, "Expertise: {}", profile.expertise);
    let _ = writeln!(
        out,
        "Industry experience: {}",
        profile.industry_experience.join(", ")
    );
    let _ = writeln!(out, "Availability: {}", profile.availability);
    let _ = writeln!(out, "Compensation: {}", profile.compensation);
    let _ = writeln!(out, "Key accomplishments:");
    for accomplishment in &profile.key_accomplishments {
        let _ = writeln!(out, "- {}", accomplishment);
    }
    out
}

/// Need block: company, scope, budget, required expertise, stage,
/// challenges, in that order. Deliverables ride along inside the scope
/// section.
pub fn startup_need_text(need: &StartupNeed) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Company: {}", need.company_name);
    let _ = writeln!(out, "Role scope: {}", need.role_summary);
    if !need.key_deliverables.is_empty() {
        let _ = writeln!(out, "Key deliverables: {}", need.key_deliverables);
    }
    let _ = writeln!(out, "Budget: {}", need.budget);
    let _ = writeln!(
        out,
        "Required expertise: {}",
        need.required_expertise.join(", ")
    );
    let _ = writeln!(out, "Stage: {}", need.stage);
    let _ = writeln!(out, "Key challenges: {}", need.key_challenges);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_need, test_profile};
    use uuid::Uuid;

    #[test]
    fn test_executive_text_field_order() {
        let mut profile = test_profile("exec-1", "Finance leadership");
        profile.industry_experience = vec!["fintech".into(), "saas".into()];
        profile.key_accomplishments = vec!["Raised series B".into()];

        let text = executive_profile_text(&profile);
        let name_pos = text.find("Name:").unwrap();
        let expertise_pos = text.find("Expertise:").unwrap();
        let industry_pos = text.find("Industry experience:").unwrap();
        let availability_pos = text.find("Availability:").unwrap();
        let compensation_pos = text.find("Compensation:").unwrap();
        let accomplishments_pos = text.find("Key accomplishments:").unwrap();

        assert!(name_pos < expertise_pos);
        assert!(expertise_pos < industry_pos);
        assert!(industry_pos < availability_pos);
        assert!(availability_pos < compensation_pos);
        assert!(compensation_pos < accomplishments_pos);
        assert!(text.contains("fintech, saas"));
        assert!(text.contains("- Raised series B"));
    }

    #[test]
    fn test_need_text_field_order() {
        let mut need = test_need(Uuid::new_v4(), "startup-1");
        need.company_name = "Acme".into();
        need.budget = "$8k/mo".into();
        need.stage = "seed".into();
        need.required_expertise = vec!["finance".into(), "fundraising".into()];
        need.key_challenges = "runway planning".into();

        let text = startup_need_text(&need);
        let company_pos = text.find("Company:").unwrap();
        let scope_pos = text.find("Role scope:").unwrap();
        let budget_pos = text.find("Budget:").unwrap();
        let expertise_pos = text.find("Required expertise:").unwrap();
        let stage_pos = text.find("Stage:").unwrap();
        let challenges_pos = text.find("Key challenges:").unwrap();

        assert!(company_pos < scope_pos);
        assert!(scope_pos < budget_pos);
        assert!(budget_pos < expertise_pos);
        assert!(expertise_pos < stage_pos);
        assert!(stage_pos < challenges_pos);
        assert!(text.contains("finance, fundraising"));
    }
}
