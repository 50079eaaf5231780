//! API route definitions

use super::handlers::{self, ApiState};
use super::{admin_handlers, marketplace_handlers, match_handlers, messaging_handlers};
use crate::auth::require_auth;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        // ====================================================================
        // Profiles
        // ====================================================================
        .route("/api/profiles", post(marketplace_handlers::save_profile))
        .route(
            "/api/profiles/{id}",
            get(marketplace_handlers::get_profile),
        )
        // ====================================================================
        // Needs
        // ====================================================================
        .route(
            "/api/needs",
            get(marketplace_handlers::list_my_needs).post(marketplace_handlers::create_need),
        )
        .route(
            "/api/needs/{need_id}",
            patch(marketplace_handlers::update_need).delete(marketplace_handlers::delete_need),
        )
        .route(
            "/api/needs/{need_id}/status",
            patch(marketplace_handlers::set_need_status),
        )
        .route(
            "/api/needs/{need_id}/matches",
            get(match_handlers::matches_for_need),
        )
        .route(
            "/api/needs/{need_id}/applications",
            get(marketplace_handlers::list_need_applications),
        )
        .route(
            "/api/needs/{need_id}/apply",
            post(marketplace_handlers::apply_to_need),
        )
        .route(
            "/api/needs/{need_id}/save",
            post(marketplace_handlers::toggle_save_opportunity),
        )
        // ====================================================================
        // Matching
        // ====================================================================
        .route("/api/matches", get(match_handlers::matches_for_me))
        .route("/api/talent-pool", get(match_handlers::talent_pool))
        // ====================================================================
        // Applications
        // ====================================================================
        .route(
            "/api/applications/{application_id}",
            patch(marketplace_handlers::update_application),
        )
        // ====================================================================
        // Saved opportunities / shortlist
        // ====================================================================
        .route(
            "/api/saved",
            get(marketplace_handlers::list_saved_opportunities),
        )
        .route(
            "/api/shortlist",
            get(marketplace_handlers::list_shortlist),
        )
        .route(
            "/api/shortlist/{executive_id}",
            post(marketplace_handlers::toggle_shortlist),
        )
        // ====================================================================
        // Conversations
        // ====================================================================
        .route(
            "/api/conversations",
            get(messaging_handlers::list_conversations)
                .post(messaging_handlers::start_conversation),
        )
        .route(
            "/api/conversations/unread-count",
            get(messaging_handlers::unread_count),
        )
        .route(
            "/api/conversations/{conversation_id}/messages",
            get(messaging_handlers::get_messages).post(messaging_handlers::send_message),
        )
        .route(
            "/api/conversations/{conversation_id}/read",
            post(messaging_handlers::mark_read),
        )
        .route(
            "/api/support",
            post(messaging_handlers::start_support_conversation),
        )
        // ====================================================================
        // Admin console
        // ====================================================================
        .route(
            "/api/admin/broadcasts",
            post(admin_handlers::publish_broadcast),
        )
        .route("/api/admin/users", get(admin_handlers::list_users))
        .route(
            "/api/admin/users/{user_id}/role",
            post(admin_handlers::set_user_role),
        )
        .route(
            "/api/admin/applications",
            get(admin_handlers::list_applications),
        )
        .route(
            "/api/admin/shortlists",
            get(admin_handlers::list_shortlists),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Public surface: health probe and the guest contact form
        .route("/health", get(handlers::health))
        .route("/api/contact", post(messaging_handlers::contact))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
