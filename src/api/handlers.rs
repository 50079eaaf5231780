//! Shared API state, error mapping and the health check

use crate::error::MarketError;
use crate::marketplace::MarketplaceManager;
use crate::matching::MatchEngine;
use crate::messaging::MessagingEngine;
use crate::oracle::ScoringOracle;
use crate::store::DocumentStore;
use crate::{AppState, Config};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

/// Shared server state
pub struct ServerState {
    pub store: Arc<dyn DocumentStore>,
    pub oracle: Arc<dyn ScoringOracle>,
    pub matching: Arc<MatchEngine>,
    pub messaging: Arc<MessagingEngine>,
    pub marketplace: Arc<MarketplaceManager>,
    pub config: Arc<Config>,
}

/// Shared server state handle
pub type ApiState = Arc<ServerState>;

impl ServerState {
    /// Wire the engines over the application state.
    pub fn from_app_state(state: AppState) -> Self {
        let matching = Arc::new(MatchEngine::new(state.store.clone(), state.oracle.clone()));
        let messaging = Arc::new(MessagingEngine::new(
            state.store.clone(),
            state.config.support_identity(),
        ));
        let marketplace = Arc::new(MarketplaceManager::new(
            state.store.clone(),
            messaging.clone(),
        ));
        Self {
            store: state.store,
            oracle: state.oracle,
            matching,
            messaging,
            marketplace,
            config: state.config,
        }
    }
}

// ============================================================================
// Health check
// ============================================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check handler — verifies actual connectivity to the store.
pub async fn health(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = state.store.health_check().await.unwrap_or(false);

    let (code, status) = if store_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

// ============================================================================
// Error handling
// ============================================================================

/// API error type with automatic HTTP status mapping
pub enum AppError {
    Internal(anyhow::Error),
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    ServiceUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            // Internal details stay in the logs; clients get a curated
            // message only.
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<MarketError> for AppError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::InvalidInput(msg) => AppError::BadRequest(msg),
            MarketError::NotFound(msg) => AppError::NotFound(msg),
            MarketError::Unauthorized => AppError::Forbidden("unauthorized".to_string()),
            MarketError::Conflict(msg) => AppError::Conflict(msg),
            MarketError::OracleUnavailable(_) => AppError::ServiceUnavailable(
                "the matching service is busy, please try again".to_string(),
            ),
            MarketError::Storage(e) => AppError::Internal(e),
        }
    }
}
