//! Client library per la chat uno-a-uno
//!
//! - `api`: client HTTP tipizzato per le route `/messages`
//! - `ws`: stream degli eventi dal WebSocket del server
//! - `sync`: regole di sincronizzazione dello stato di lettura

pub mod api;
pub mod error;
pub mod sync;
pub mod types;
pub mod ws;

pub use api::{ChatApi, HttpChatApi};
pub use error::{ClientError, Result};
pub use sync::ReadStateSync;
pub use types::{MarkRead, Message, OutgoingMessage, ServerEvent, User};
pub use ws::connect_events;
