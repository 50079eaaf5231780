//! Admin console handlers
//!
//! Every handler re-verifies the caller's Admin role against the identity
//! directory inside the engine call; the JWT alone is never enough.

use super::handlers::{ApiState, AppError};
use crate::auth::Claims;
use crate::store::models::*;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct BroadcastRequest {
    pub text: String,
}

pub async fn publish_broadcast(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BroadcastRequest>,
) -> Result<Json<Broadcast>, AppError> {
    Ok(Json(
        state
            .messaging
            .broadcast_message_to_all_users(&claims.sub, &req.text)
            .await?,
    ))
}

pub async fn list_users(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    Ok(Json(state.marketplace.admin_list_users(&claims.sub).await?))
}

pub async fn list_applications(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Application>>, AppError> {
    Ok(Json(
        state.marketplace.admin_list_applications(&claims.sub).await?,
    ))
}

pub async fn list_shortlists(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ShortlistedExecutive>>, AppError> {
    Ok(Json(
        state.marketplace.admin_list_shortlists(&claims.sub).await?,
    ))
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

pub async fn set_user_role(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserRecord>, AppError> {
    Ok(Json(
        state
            .marketplace
            .admin_set_user_role(&claims.sub, &user_id, req.role)
            .await?,
    ))
}
