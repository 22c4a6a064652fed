//! WebSocket Module - Gestione WebSocket per comunicazione real-time
//!
//! Il WebSocket è il canale di consegna degli eventi dal server al client:
//! - Gestione upgrade HTTP -> WebSocket
//! - Registro di presenza (una connessione per utente, vince l'ultima)
//! - Publish degli eventi `newMessage` e `messagesRead`

pub mod connection;
pub mod delivery;
pub mod usermap;

// Re-exports pubblici
pub use connection::handle_socket;
pub use delivery::{DeliveryChannel, Subscription};

use crate::{AppState, entities::User};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Entry point per gestire richieste di upgrade WebSocket
/// Operazioni:
/// 1. Estrarre user_id dall'autenticazione JWT
/// 2. Eseguire upgrade HTTP -> WebSocket
/// 3. Passare la connessione ad handle_socket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // ottenuto dall'autenticazione JWT
) -> Response {
    let user_id = current_user.user_id;

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}
