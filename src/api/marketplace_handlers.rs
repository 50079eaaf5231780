//! Profile, need, application and saved-set handlers
//!
//! Thin wrappers: extract the caller from the JWT claims, delegate to the
//! marketplace manager, map domain errors onto HTTP statuses.

use super::handlers::{ApiState, AppError};
use crate::auth::Claims;
use crate::marketplace::{NeedDraft, ProfileDraft};
use crate::store::models::*;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

// ============================================================================
// Profiles
// ============================================================================

pub async fn save_profile(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<ExecutiveProfile>, AppError> {
    let profile = state.marketplace.save_profile(&claims.sub, draft).await?;
    Ok(Json(profile))
}

pub async fn get_profile(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ExecutiveProfile>, AppError> {
    Ok(Json(state.marketplace.get_profile(&id).await?))
}

// ============================================================================
// Needs
// ============================================================================

pub async fn create_need(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<NeedDraft>,
) -> Result<Json<StartupNeed>, AppError> {
    Ok(Json(state.marketplace.create_need(&claims.sub, draft).await?))
}

pub async fn list_my_needs(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<StartupNeed>>, AppError> {
    Ok(Json(
        state.marketplace.list_needs_for_startup(&claims.sub).await?,
    ))
}

pub async fn update_need(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(need_id): Path<Uuid>,
    Json(draft): Json<NeedDraft>,
) -> Result<Json<StartupNeed>, AppError> {
    Ok(Json(
        state
            .marketplace
            .update_need(&claims.sub, need_id, draft)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct SetNeedStatusRequest {
    pub status: NeedStatus,
}

pub async fn set_need_status(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(need_id): Path<Uuid>,
    Json(req): Json<SetNeedStatusRequest>,
) -> Result<Json<StartupNeed>, AppError> {
    Ok(Json(
        state
            .marketplace
            .set_need_status(&claims.sub, need_id, req.status)
            .await?,
    ))
}

pub async fn delete_need(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(need_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.marketplace.delete_need(&claims.sub, need_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ============================================================================
// Applications
// ============================================================================

pub async fn apply_to_need(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(need_id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    Ok(Json(state.marketplace.apply(&claims.sub, need_id).await?))
}

pub async fn list_need_applications(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(need_id): Path<Uuid>,
) -> Result<Json<Vec<Application>>, AppError> {
    Ok(Json(
        state
            .marketplace
            .list_applications_for_need(&claims.sub, need_id)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct UpdateApplicationRequest {
    pub status: ApplicationStatus,
    /// Send the executive a status-change message through their direct
    /// conversation with the startup.
    #[serde(default)]
    pub notify: bool,
}

pub async fn update_application(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(application_id): Path<String>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<Application>, AppError> {
    Ok(Json(
        state
            .marketplace
            .update_application_status(&claims.sub, &application_id, req.status, req.notify)
            .await?,
    ))
}

// ============================================================================
// Saved opportunities / shortlist
// ============================================================================

#[derive(Deserialize)]
pub struct ToggleSaveRequest {
    pub currently_saved: bool,
}

pub async fn toggle_save_opportunity(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(need_id): Path<Uuid>,
    Json(req): Json<ToggleSaveRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let saved = state
        .marketplace
        .toggle_save_opportunity(&claims.sub, need_id, req.currently_saved)
        .await?;
    Ok(Json(serde_json::json!({ "saved": saved })))
}

pub async fn list_saved_opportunities(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<SavedOpportunity>>, AppError> {
    Ok(Json(
        state.marketplace.list_saved_opportunities(&claims.sub).await?,
    ))
}

#[derive(Deserialize)]
pub struct ToggleShortlistRequest {
    pub currently_shortlisted: bool,
}

pub async fn toggle_shortlist(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(executive_id): Path<String>,
    Json(req): Json<ToggleShortlistRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let shortlisted = state
        .marketplace
        .toggle_shortlist(&claims.sub, &executive_id, req.currently_shortlisted)
        .await?;
    Ok(Json(serde_json::json!({ "shortlisted": shortlisted })))
}

pub async fn list_shortlist(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ShortlistedExecutive>>, AppError> {
    Ok(Json(state.marketplace.list_shortlist(&claims.sub).await?))
}
