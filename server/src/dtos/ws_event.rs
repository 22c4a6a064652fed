//! WebSocket Event DTOs - Data Transfer Objects per eventi WebSocket

use serde::{Deserialize, Serialize};

use crate::dtos::MessageDTO;

/// Tagged union per eventi WebSocket
/// Serde serializza questo come:
/// { "type": "newMessage", "data": { ... } }
/// oppure
/// { "type": "messagesRead", "data": { "readerId": 2, "count": 3 } }
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WsEventDTO {
    NewMessage(MessageDTO),
    MessagesRead { reader_id: i32, count: u64 },
    Error { code: u16, message: String },
}

impl WsEventDTO {
    /// Nome dell'evento, usato nei log
    pub fn name(&self) -> &'static str {
        match self {
            WsEventDTO::NewMessage(_) => "newMessage",
            WsEventDTO::MessagesRead { .. } => "messagesRead",
            WsEventDTO::Error { .. } => "error",
        }
    }
}
