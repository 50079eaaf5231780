//! Conversation, messaging, support and contact handlers

use super::handlers::{ApiState, AppError};
use crate::auth::Claims;
use crate::messaging::ConversationSummary;
use crate::store::models::{ChannelKind, Conversation, Message};
use crate::store::ConversationLinks;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

/// The caller's inbox: conversations plus broadcasts, newest activity
/// first.
pub async fn list_conversations(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    Ok(Json(
        state
            .messaging
            .get_conversations_for_user(&claims.sub)
            .await?,
    ))
}

pub async fn unread_count(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = state.messaging.get_unread_message_count(&claims.sub).await?;
    Ok(Json(serde_json::json!({ "unread": count })))
}

#[derive(Deserialize)]
pub struct StartConversationRequest {
    pub participant_id: String,
}

pub async fn start_conversation(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(
        state
            .messaging
            .start_or_get_conversation(
                &claims.sub,
                &req.participant_id,
                ChannelKind::Direct,
                ConversationLinks::default(),
            )
            .await?,
    ))
}

pub async fn get_messages(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<Message>>, AppError> {
    Ok(Json(
        state
            .messaging
            .get_messages(&claims.sub, &conversation_id)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

pub async fn send_message(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, AppError> {
    Ok(Json(
        state
            .messaging
            .send_message(&conversation_id, &claims.sub, &req.text)
            .await?,
    ))
}

pub async fn mark_read(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .messaging
        .mark_conversation_as_read(&claims.sub, &conversation_id)
        .await?;
    Ok(Json(serde_json::json!({ "read": true })))
}

#[derive(Deserialize)]
pub struct SupportRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Open (or reuse) the caller's support thread.
pub async fn start_support_conversation(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SupportRequest>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(
        state
            .messaging
            .start_or_get_admin_conversation(Some(&claims.sub), req.message.as_deref(), None)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct ContactRequest {
    pub message: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Unauthenticated "contact us" submission: synthesizes a guest identity
/// and routes to support. Mounted outside the auth layer.
pub async fn contact(
    State(state): State<ApiState>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(
        state
            .messaging
            .start_or_get_admin_conversation(None, Some(&req.message), req.name.as_deref())
            .await?,
    ))
}
