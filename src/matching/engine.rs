//! Match Engine
//!
//! Orchestrates bulk pairwise scoring between one entity and a set of
//! candidates: role → all executives, executive → all active needs, and
//! startup → talent pool (best score across the startup's open roles).
//! Scoring calls fan out concurrently and are awaited together; one failed
//! oracle call aborts the whole batch.

use super::text::{executive_profile_text, startup_need_text};
use crate::error::{MarketError, Result};
use crate::oracle::{MatchSignal, ScoringOracle};
use crate::store::models::*;
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// A scored executive, as seen by a startup.
#[derive(Debug, Clone, Serialize)]
pub struct RankedExecutive {
    #[serde(flatten)]
    pub profile: ExecutiveProfile,
    pub score: f64,
    pub rationale: String,
    pub recommendation: String,
    pub is_shortlisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortlisted_at: Option<DateTime<Utc>>,
}

/// A scored need, as seen by an executive.
#[derive(Debug, Clone, Serialize)]
pub struct RankedNeed {
    #[serde(flatten)]
    pub need: StartupNeed,
    pub score: f64,
    pub rationale: String,
    pub recommendation: String,
    pub is_saved: bool,
    pub is_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_status: Option<ApplicationStatus>,
}

pub struct MatchEngine {
    store: Arc<dyn DocumentStore>,
    oracle: Arc<dyn ScoringOracle>,
}

fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

impl MatchEngine {
    pub fn new(store: Arc<dyn DocumentStore>, oracle: Arc<dyn ScoringOracle>) -> Self {
        Self { store, oracle }
    }

    /// Score one candidate pair through the oracle.
    pub async fn score_candidate(
        &self,
        profile: &ExecutiveProfile,
        need: &StartupNeed,
    ) -> Result<MatchSignal> {
        self.oracle
            .score(&executive_profile_text(profile), &startup_need_text(need))
            .await
    }

    /// Every executive in the system scored against one role, ranked by
    /// score descending. Shortlist state is overlaid for the role's owner.
    pub async fn find_matches_for_role(&self, need_id: uuid::Uuid) -> Result<Vec<RankedExecutive>> {
        let need = self
            .store
            .get_need(need_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("need {}", need_id)))?;

        let profiles = self.store.list_profiles().await?;
        let shortlist: HashMap<String, DateTime<Utc>> = self
            .store
            .list_shortlisted_executives(&need.creator_id)
            .await?
            .into_iter()
            .map(|s| (s.executive_id, s.shortlisted_at))
            .collect();

        tracing::debug!(
            need_id = %need_id,
            candidates = profiles.len(),
            "scoring executives for role"
        );

        let signals = try_join_all(
            profiles
                .iter()
                .map(|profile| self.score_candidate(profile, &need)),
        )
        .await?;

        let mut ranked: Vec<RankedExecutive> = profiles
            .into_iter()
            .zip(signals)
            .map(|(profile, signal)| {
                let shortlisted_at = shortlist.get(&profile.id).copied();
                RankedExecutive {
                    is_shortlisted: shortlisted_at.is_some(),
                    shortlisted_at,
                    score: signal.score,
                    rationale: signal.rationale,
                    recommendation: signal.recommendation,
                    profile,
                }
            })
            .collect();
        ranked.sort_by(|a, b| by_score_desc(a.score, b.score));
        Ok(ranked)
    }

    /// Every active need scored against one executive, ranked by score
    /// descending, with the executive's saved/applied state overlaid.
    /// Zero active needs is an empty result, not an error.
    pub async fn find_matches_for_executive(
        &self,
        executive_id: &str,
    ) -> Result<Vec<RankedNeed>> {
        let profile = self
            .store
            .get_profile(executive_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("profile {}", executive_id)))?;

        let needs = self.store.list_active_needs().await?;
        if needs.is_empty() {
            return Ok(vec![]);
        }

        let saved: HashMap<uuid::Uuid, ()> = self
            .store
            .list_saved_opportunities(executive_id)
            .await?
            .into_iter()
            .map(|s| (s.need_id, ()))
            .collect();
        let applications: HashMap<uuid::Uuid, ApplicationStatus> = self
            .store
            .list_applications_for_executive(executive_id)
            .await?
            .into_iter()
            .map(|a| (a.need_id, a.status))
            .collect();

        let signals = try_join_all(
            needs
                .iter()
                .map(|need| self.score_candidate(&profile, need)),
        )
        .await?;

        let mut ranked: Vec<RankedNeed> = needs
            .into_iter()
            .zip(signals)
            .map(|(need, signal)| {
                let application_status = applications.get(&need.id).copied();
                RankedNeed {
                    is_saved: saved.contains_key(&need.id),
                    is_applied: application_status.is_some(),
                    application_status,
                    score: signal.score,
                    rationale: signal.rationale,
                    recommendation: signal.recommendation,
                    need,
                }
            })
            .collect();
        ranked.sort_by(|a, b| by_score_desc(a.score, b.score));
        Ok(ranked)
    }

    /// Best possible fit for any of a startup's open roles: the maximum
    /// score across the given needs. Zero needs scores 0.
    ///
    /// Cost is one oracle call per need; callers iterating over all
    /// executives multiply that into O(executives × needs) calls, which is
    /// the hottest path in the system under load.
    pub async fn best_score_across_needs(
        &self,
        profile: &ExecutiveProfile,
        needs: &[StartupNeed],
    ) -> Result<f64> {
        if needs.is_empty() {
            return Ok(0.0);
        }
        let signals = try_join_all(
            needs
                .iter()
                .map(|need| self.score_candidate(profile, need)),
        )
        .await?;
        Ok(signals
            .into_iter()
            .map(|s| s.score)
            .fold(0.0_f64, f64::max))
    }

    /// The talent pool as seen by one startup: every executive, annotated
    /// with the best score across that startup's active needs and the
    /// startup's shortlist state, ranked by score descending.
    pub async fn rank_talent_pool(&self, startup_id: &str) -> Result<Vec<RankedExecutive>> {
        let profiles = self.store.list_profiles().await?;
        let needs: Vec<StartupNeed> = self
            .store
            .list_needs_by_creator(startup_id)
            .await?
            .into_iter()
            .filter(|n| n.status == NeedStatus::Active)
            .collect();
        let shortlist: HashMap<String, DateTime<Utc>> = self
            .store
            .list_shortlisted_executives(startup_id)
            .await?
            .into_iter()
            .map(|s| (s.executive_id, s.shortlisted_at))
            .collect();

        let scores = try_join_all(
            profiles
                .iter()
                .map(|profile| self.best_score_across_needs(profile, &needs)),
        )
        .await?;

        let mut ranked: Vec<RankedExecutive> = profiles
            .into_iter()
            .zip(scores)
            .map(|(profile, score)| {
                let shortlisted_at = shortlist.get(&profile.id).copied();
                RankedExecutive {
                    is_shortlisted: shortlisted_at.is_some(),
                    shortlisted_at,
                    score,
                    rationale: String::new(),
                    recommendation: String::new(),
                    profile,
                }
            })
            .collect();
        ranked.sort_by(|a, b| by_score_desc(a.score, b.score));
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockScoringOracle;
    use crate::store::mock::MockDocumentStore;
    use crate::test_helpers::{test_need, test_profile};
    use uuid::Uuid;

    fn engine_with(
        store: Arc<MockDocumentStore>,
        oracle: Arc<MockScoringOracle>,
    ) -> MatchEngine {
        MatchEngine::new(store, oracle)
    }

    #[tokio::test]
    async fn test_find_matches_for_executive_sorted_and_overlaid() {
        let store = Arc::new(MockDocumentStore::new());
        let oracle = Arc::new(MockScoringOracle::new());

        let profile = test_profile("exec-1", "finance fundraising saas metrics");
        store.upsert_profile(&profile).await.unwrap();

        let mut strong = test_need(Uuid::new_v4(), "startup-1");
        strong.required_expertise = vec!["finance".into(), "fundraising".into()];
        strong.key_challenges = "saas metrics discipline".into();
        store.upsert_need(&strong).await.unwrap();

        let mut weak = test_need(Uuid::new_v4(), "startup-2");
        weak.role_summary = "Fractional CMO".into();
        weak.required_expertise = vec!["branding".into()];
        store.upsert_need(&weak).await.unwrap();

        store
            .add_saved_opportunity("exec-1", strong.id)
            .await
            .unwrap();
        store
            .insert_application_if_absent(&Application::new("exec-1", weak.id))
            .await
            .unwrap();

        let engine = engine_with(store, oracle);
        let matches = engine.find_matches_for_executive("exec-1").await.unwrap();

        assert_eq!(matches.len(), 2);
        // Sorted non-increasing by score.
        assert!(matches[0].score >= matches[1].score);
        for m in &matches {
            assert!((0.0..=1.0).contains(&m.score));
        }

        let strong_match = matches.iter().find(|m| m.need.id == strong.id).unwrap();
        assert!(strong_match.is_saved);
        assert!(!strong_match.is_applied);

        let weak_match = matches.iter().find(|m| m.need.id == weak.id).unwrap();
        assert!(weak_match.is_applied);
        assert_eq!(
            weak_match.application_status,
            Some(ApplicationStatus::Applied)
        );
    }

    #[tokio::test]
    async fn test_zero_active_needs_is_empty_not_error() {
        let store = Arc::new(MockDocumentStore::new());
        store
            .upsert_profile(&test_profile("exec-1", "finance"))
            .await
            .unwrap();

        let mut inactive = test_need(Uuid::new_v4(), "startup-1");
        inactive.status = NeedStatus::Inactive;
        store.upsert_need(&inactive).await.unwrap();

        let oracle = Arc::new(MockScoringOracle::new());
        let engine = engine_with(store, oracle.clone());
        let matches = engine.find_matches_for_executive("exec-1").await.unwrap();
        assert!(matches.is_empty());
        // Inactive needs never reach the oracle.
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() {
        let store = Arc::new(MockDocumentStore::new());
        let engine = engine_with(store, Arc::new(MockScoringOracle::new()));
        let err = engine.find_matches_for_executive("ghost").await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_one_oracle_failure_aborts_whole_batch() {
        let store = Arc::new(MockDocumentStore::new());
        store
            .upsert_profile(&test_profile("exec-1", "finance"))
            .await
            .unwrap();
        store
            .upsert_profile(&test_profile("exec-2", "poisonterm marketing"))
            .await
            .unwrap();

        let need = test_need(Uuid::new_v4(), "startup-1");
        store.upsert_need(&need).await.unwrap();

        let oracle = Arc::new(MockScoringOracle::failing_on("poisonterm"));
        let engine = engine_with(store, oracle);

        // No partial results: the whole ranking fails.
        let err = engine.find_matches_for_role(need.id).await.unwrap_err();
        assert!(matches!(err, MarketError::OracleUnavailable(_)));
    }

    #[tokio::test]
    async fn test_best_score_across_needs_takes_max() {
        let store = Arc::new(MockDocumentStore::new());
        let engine = engine_with(store, Arc::new(MockScoringOracle::new()));

        let profile = test_profile("exec-1", "finance fundraising");
        let mut close = test_need(Uuid::new_v4(), "startup-1");
        close.required_expertise = vec!["finance".into(), "fundraising".into()];
        let mut far = test_need(Uuid::new_v4(), "startup-1");
        far.role_summary = "Fractional CTO".into();
        far.required_expertise = vec!["kubernetes".into()];

        let needs = vec![far.clone(), close.clone()];
        let best = engine
            .best_score_across_needs(&profile, &needs)
            .await
            .unwrap();
        let close_alone = engine
            .best_score_across_needs(&profile, &[close])
            .await
            .unwrap();
        assert_eq!(best, close_alone);

        // No needs → zero, no oracle involvement.
        assert_eq!(
            engine.best_score_across_needs(&profile, &[]).await.unwrap(),
            0.0
        );
    }

    #[tokio::test]
    async fn test_talent_pool_overlays_shortlist() {
        let store = Arc::new(MockDocumentStore::new());
        store
            .upsert_profile(&test_profile("exec-1", "finance"))
            .await
            .unwrap();
        store
            .upsert_profile(&test_profile("exec-2", "marketing"))
            .await
            .unwrap();
        store.upsert_need(&test_need(Uuid::new_v4(), "startup-1")).await.unwrap();
        store
            .add_shortlisted_executive("startup-1", "exec-2")
            .await
            .unwrap();

        let engine = engine_with(store, Arc::new(MockScoringOracle::new()));
        let pool = engine.rank_talent_pool("startup-1").await.unwrap();

        assert_eq!(pool.len(), 2);
        let shortlisted = pool.iter().find(|e| e.profile.id == "exec-2").unwrap();
        assert!(shortlisted.is_shortlisted);
        assert!(shortlisted.shortlisted_at.is_some());
        let other = pool.iter().find(|e| e.profile.id == "exec-1").unwrap();
        assert!(!other.is_shortlisted);
    }
}
