//! MessageRepository - Repository per la gestione dei messaggi

use super::{Create, PoolType, Read};
use crate::dtos::CreateMessageDTO;
use crate::entities::Message;
use chrono::Utc;
use sqlx::Error;
use std::collections::BTreeMap;

const MESSAGE_COLUMNS: &str = r#"
    message_id,
    sender_id,
    receiver_id,
    text,
    image,
    file,
    file_name,
    is_read,
    created_at,
    updated_at
"#;

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: PoolType,
}

impl MessageRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// Tutti i messaggi scambiati tra `user_a` e `user_b`, in entrambe le direzioni,
    /// ordinati per data di creazione (l'id risolve i pareggi). Nessuna paginazione.
    pub async fn find_conversation(
        &self,
        user_a: &i32,
        user_b: &i32,
    ) -> Result<Vec<Message>, Error> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE (sender_id = ? AND receiver_id = ?)
               OR (sender_id = ? AND receiver_id = ?)
            ORDER BY created_at ASC, message_id ASC
            "#
        );

        sqlx::query_as::<_, Message>(&sql)
            .bind(user_a)
            .bind(user_b)
            .bind(user_b)
            .bind(user_a)
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Segna come letti i messaggi non letti da `sender_id` a `receiver_id`.
    /// Tocca solo le righe con `is_read = 0`, quindi una seconda chiamata ritorna 0.
    ///
    /// # Returns
    /// Numero di messaggi passati da non letto a letto
    pub async fn mark_read(&self, sender_id: &i32, receiver_id: &i32) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = 1, updated_at = ?
            WHERE sender_id = ? AND receiver_id = ? AND is_read = 0
            "#,
        )
        .bind(Utc::now())
        .bind(sender_id)
        .bind(receiver_id)
        .execute(&self.connection_pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Conteggio dei messaggi non letti indirizzati a `viewer_id`, raggruppati per mittente.
    /// I mittenti senza messaggi non letti non compaiono nella mappa.
    pub async fn unread_tally(&self, viewer_id: &i32) -> Result<BTreeMap<i32, i64>, Error> {
        let rows = sqlx::query_as::<_, (i32, i64)>(
            r#"
            SELECT sender_id, COUNT(*) AS count
            FROM messages
            WHERE receiver_id = ? AND is_read = 0
            GROUP BY sender_id
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Ultimo messaggio di ogni conversazione a cui partecipa `viewer_id`,
    /// dal più recente al più vecchio
    pub async fn last_messages(&self, viewer_id: &i32) -> Result<Vec<Message>, Error> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE message_id IN (
                SELECT MAX(message_id)
                FROM messages
                WHERE sender_id = ? OR receiver_id = ?
                GROUP BY CASE WHEN sender_id = ? THEN receiver_id ELSE sender_id END
            )
            ORDER BY created_at DESC, message_id DESC
            "#
        );

        sqlx::query_as::<_, Message>(&sql)
            .bind(viewer_id)
            .bind(viewer_id)
            .bind(viewer_id)
            .fetch_all(&self.connection_pool)
            .await
    }
}

impl Create<Message, CreateMessageDTO> for MessageRepository {
    async fn create(&self, data: &CreateMessageDTO) -> Result<Message, Error> {
        // i timestamp li assegna lo store, non il client
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO messages (sender_id, receiver_id, text, image, file, file_name, is_read, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(data.sender_id)
        .bind(data.receiver_id)
        .bind(&data.text)
        .bind(&data.image)
        .bind(&data.file)
        .bind(&data.file_name)
        .bind(now)
        .bind(now)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_rowid() as i32;

        Ok(Message {
            message_id: new_id,
            sender_id: data.sender_id,
            receiver_id: data.receiver_id,
            text: data.text.clone(),
            image: data.image.clone(),
            file: data.file.clone(),
            file_name: data.file_name.clone(),
            read: false,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Read<Message, i32> for MessageRepository {
    async fn read(&self, id: &i32) -> Result<Option<Message>, Error> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?");

        sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
