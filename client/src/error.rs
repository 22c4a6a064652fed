//! Client errors - Errori lato client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Errore di trasporto HTTP
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Il server ha risposto con uno status di errore
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Nessuna conversazione aperta per l'operazione richiesta
    #[error("No conversation is open")]
    NoConversation,

    #[error("Invalid token for authorization header")]
    InvalidToken,
}

pub type Result<T> = std::result::Result<T, ClientError>;
