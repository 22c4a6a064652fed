//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod attachment;
pub mod message;
pub mod user;

// Re-exports per facilitare l'import
pub use attachment::{download_attachment, preview_attachment};
pub use message::{
    get_conversation, get_last_messages, get_unread_counts, mark_conversation_read, send_message,
};
pub use user::list_users_for_sidebar;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
