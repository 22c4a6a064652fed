//! User DTOs - Data Transfer Objects per utenti

use crate::entities::User;
use serde::{Deserialize, Serialize};

// struct per gestire io col client, senza campi di credenziali
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserDTO {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub profile_pic: Option<String>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        // la password non viene mai esposta al client
        Self {
            id: value.user_id,
            username: value.username,
            full_name: value.full_name,
            profile_pic: value.profile_pic,
        }
    }
}

/// DTO per creare un nuovo utente (senza user_id)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateUserDTO {
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub profile_pic: Option<String>,
}
