//! User entity - Entità utente

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i32,
    pub username: String,
    pub full_name: String,
    // hash della password, gestito dal servizio di autenticazione esterno
    pub password: String,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
}
