//! UserRepository - Repository per la gestione degli utenti

use super::{Create, PoolType, Read};
use crate::dtos::CreateUserDTO;
use crate::entities::User;
use chrono::Utc;
use sqlx::Error;

// USER REPO
pub struct UserRepository {
    connection_pool: PoolType,
}

impl UserRepository {
    pub fn new(connection_pool: PoolType) -> UserRepository {
        Self { connection_pool }
    }

    ///considero l'username univoco
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, username, full_name, password, profile_pic, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Tutti gli utenti tranne `user_id`, per la sidebar dei contatti
    pub async fn find_all_except(&self, user_id: &i32) -> Result<Vec<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, full_name, password, profile_pic, created_at
            FROM users
            WHERE user_id <> ?
            ORDER BY full_name ASC, user_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Verifica l'esistenza di un utente senza caricarne il profilo
    pub async fn exists(&self, user_id: &i32) -> Result<bool, Error> {
        let found = sqlx::query_scalar::<_, i32>("SELECT user_id FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.connection_pool)
            .await?;
        Ok(found.is_some())
    }
}

impl Create<User, CreateUserDTO> for UserRepository {
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, full_name, password, profile_pic, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&data.username)
        .bind(&data.full_name)
        .bind(&data.password)
        .bind(&data.profile_pic)
        .bind(now)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_rowid() as i32;

        Ok(User {
            user_id: new_id,
            username: data.username.clone(),
            full_name: data.full_name.clone(),
            password: data.password.clone(),
            profile_pic: data.profile_pic.clone(),
            created_at: now,
        })
    }
}

impl Read<User, i32> for UserRepository {
    async fn read(&self, id: &i32) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, username, full_name, password, profile_pic, created_at FROM users WHERE user_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
