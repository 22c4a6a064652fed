//! Server library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{any, get, post},
};
use std::sync::Arc;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use crate::core::authentication_middleware;
    use ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/messages", configure_message_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        )
        .with_state(state)
}

/// Configura le routes delle conversazioni, tutte autenticate
fn configure_message_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    // i segmenti statici hanno la precedenza su `/{peer_id}`
    Router::new()
        .route("/users", get(list_users_for_sidebar))
        .route("/last-messages", get(get_last_messages))
        .route("/unread/counts", get(get_unread_counts))
        .route("/send/{peer_id}", post(send_message))
        .route("/read/{peer_id}", post(mark_conversation_read))
        .route("/download/{message_id}", get(download_attachment))
        .route("/preview/{message_id}", get(preview_attachment))
        .route("/{peer_id}", get(get_conversation))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
