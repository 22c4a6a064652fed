//! Chat API - Client HTTP tipizzato per le route `/messages`

use crate::error::{ClientError, Result};
use crate::types::{MarkRead, Message, OutgoingMessage, User};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Superficie HTTP usata dal sincronizzatore dello stato di lettura
#[allow(async_fn_in_trait)]
pub trait ChatApi {
    async fn get_users(&self) -> Result<Vec<User>>;

    /// Messaggi tra il chiamante e `peer_id`, in ordine di creazione
    async fn get_messages(&self, peer_id: i32) -> Result<Vec<Message>>;

    async fn send_message(&self, peer_id: i32, message: &OutgoingMessage) -> Result<Message>;

    /// Segna come letti i messaggi di `peer_id` verso il chiamante
    async fn mark_read(&self, peer_id: i32) -> Result<MarkRead>;

    /// Conteggio dei non letti per mittente, calcolato dal server
    async fn unread_counts(&self) -> Result<BTreeMap<i32, u64>>;
}

/// Implementazione di `ChatApi` sopra reqwest, autenticata con bearer token
#[derive(Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }
}

/// Decodifica il corpo JSON oppure trasforma la risposta di errore in `ClientError::Status`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    // il server risponde con { "error": "...", "details": "..." }
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
    warn!(status = status.as_u16(), %message, "Request rejected by server");

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

impl ChatApi for HttpChatApi {
    #[instrument(skip(self))]
    async fn get_users(&self) -> Result<Vec<User>> {
        decode(self.get("/messages/users").send().await?).await
    }

    #[instrument(skip(self))]
    async fn get_messages(&self, peer_id: i32) -> Result<Vec<Message>> {
        let messages: Vec<Message> =
            decode(self.get(&format!("/messages/{peer_id}")).send().await?).await?;
        debug!(count = messages.len(), "Conversation fetched");
        Ok(messages)
    }

    #[instrument(skip(self, message))]
    async fn send_message(&self, peer_id: i32, message: &OutgoingMessage) -> Result<Message> {
        let response = self
            .post(&format!("/messages/send/{peer_id}"))
            .json(message)
            .send()
            .await?;
        decode(response).await
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, peer_id: i32) -> Result<MarkRead> {
        decode(self.post(&format!("/messages/read/{peer_id}")).send().await?).await
    }

    #[instrument(skip(self))]
    async fn unread_counts(&self) -> Result<BTreeMap<i32, u64>> {
        decode(self.get("/messages/unread/counts").send().await?).await
    }
}
