//! Message entity - Entità messaggio

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Message {
    pub message_id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub text: Option<String>,
    // riferimenti all'object storage, il server non conserva i byte dell'allegato
    pub image: Option<String>,
    pub file: Option<String>,
    pub file_name: Option<String>,
    // passa solo da false a true, mai il contrario
    #[sqlx(rename = "is_read")]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// true se `user_id` è mittente o destinatario del messaggio
    pub fn involves(&self, user_id: i32) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// L'altro partecipante della conversazione rispetto a `viewer_id`
    pub fn peer_of(&self, viewer_id: i32) -> i32 {
        if self.sender_id == viewer_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}
