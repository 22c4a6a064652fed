//! Message DTOs - Data Transfer Objects per messaggi

use crate::entities::Message;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

lazy_static! {
    // niente separatori di percorso, virgolette o caratteri di controllo:
    // il nome finisce nell'header Content-Disposition del download
    static ref FILE_NAME_RE: Regex = Regex::new(r#"^[^/\\"\x00-\x1f\x7f]{1,255}$"#)
        .unwrap_or_else(|e| panic!("invalid file name pattern: {e}"));
}

/// Rappresentazione di un messaggio verso il client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDTO {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub text: Option<String>,
    pub image: Option<String>,
    pub file: Option<String>,
    pub file_name: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            id: value.message_id,
            sender_id: value.sender_id,
            receiver_id: value.receiver_id,
            text: value.text,
            image: value.image,
            file: value.file,
            file_name: value.file_name,
            read: value.read,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Body di `POST /messages/send/{peer_id}`
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message text must be between 1 and 5000 characters"))]
    pub text: Option<String>,

    #[validate(url(message = "Image must be a URL into the object store"))]
    pub image: Option<String>,

    #[validate(url(message = "File must be a URL into the object store"))]
    pub file: Option<String>,

    pub file_name: Option<String>,
}

impl SendMessageDTO {
    /// Regole che coinvolgono più campi, da eseguire dopo `validate()`
    pub fn validate_payload(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.text.is_none() && self.image.is_none() && self.file.is_none() {
            let mut err = ValidationError::new("empty_message");
            err.message = Some("A message needs text, an image or a file".into());
            errors.add("text", err);
        }

        if let Some(name) = &self.file_name {
            if !FILE_NAME_RE.is_match(name) {
                let mut err = ValidationError::new("file_name");
                err.message = Some("File name contains forbidden characters".into());
                errors.add("fileName", err);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// DTO per creare un nuovo messaggio (senza message_id e timestamp, assegnati dallo store)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateMessageDTO {
    pub sender_id: i32,
    pub receiver_id: i32,
    pub text: Option<String>,
    pub image: Option<String>,
    pub file: Option<String>,
    pub file_name: Option<String>,
}

impl CreateMessageDTO {
    pub fn from_send(sender_id: i32, receiver_id: i32, body: SendMessageDTO) -> Self {
        Self {
            sender_id,
            receiver_id,
            text: body.text,
            image: body.image,
            file: body.file,
            file_name: body.file_name,
        }
    }
}

/// Risposta di `POST /messages/read/{peer_id}`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadDTO {
    pub success: bool,
    pub modified_count: u64,
}
