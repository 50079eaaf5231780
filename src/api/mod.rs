//! HTTP API for the marketplace engines

pub mod admin_handlers;
pub mod handlers;
pub mod marketplace_handlers;
pub mod match_handlers;
pub mod messaging_handlers;
pub mod routes;

pub use handlers::{ApiState, AppError, ServerState};
pub use routes::create_router;
