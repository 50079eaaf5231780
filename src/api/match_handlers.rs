//! Matching handlers

use super::handlers::{ApiState, AppError};
use crate::auth::Claims;
use crate::matching::{RankedExecutive, RankedNeed};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

/// Every executive ranked against one of the caller's roles.
pub async fn matches_for_need(
    State(state): State<ApiState>,
    Path(need_id): Path<Uuid>,
) -> Result<Json<Vec<RankedExecutive>>, AppError> {
    Ok(Json(state.matching.find_matches_for_role(need_id).await?))
}

/// Every active role ranked for the calling executive.
pub async fn matches_for_me(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<RankedNeed>>, AppError> {
    Ok(Json(
        state.matching.find_matches_for_executive(&claims.sub).await?,
    ))
}

/// The talent pool ranked by best fit across the calling startup's open
/// roles.
pub async fn talent_pool(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<RankedExecutive>>, AppError> {
    Ok(Json(state.matching.rank_talent_pool(&claims.sub).await?))
}
