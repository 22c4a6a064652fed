//! Read-State Synchronizer - Regole reattive per lettura e conteggi non letti
//!
//! Decide quando chiamare mark-read e quando invalidare il conteggio locale dei
//! non letti, in base alla conversazione aperta e agli eventi in arrivo.
//! Non c'è una macchina a stati: ogni evento applica la propria regola.

use crate::api::ChatApi;
use crate::error::{ClientError, Result};
use crate::types::{Message, OutgoingMessage, ServerEvent, User};
use futures_util::{Stream, StreamExt};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

pub struct ReadStateSync<A: ChatApi> {
    api: A,
    viewer_id: i32,
    users: Vec<User>,
    selected: Option<i32>,
    messages: Vec<Message>,
    unread: BTreeMap<i32, u64>,
}

impl<A: ChatApi> ReadStateSync<A> {
    pub fn new(api: A, viewer_id: i32) -> Self {
        Self {
            api,
            viewer_id,
            users: Vec::new(),
            selected: None,
            messages: Vec::new(),
            unread: BTreeMap::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Peer della conversazione aperta
    pub fn selected_peer(&self) -> Option<i32> {
        self.selected
    }

    /// Messaggi della conversazione aperta
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn unread_counts(&self) -> &BTreeMap<i32, u64> {
        &self.unread
    }

    pub fn unread_for(&self, peer_id: i32) -> u64 {
        self.unread.get(&peer_id).copied().unwrap_or(0)
    }

    /// Carica la sidebar e il conteggio iniziale dei non letti
    pub async fn load(&mut self) -> Result<()> {
        self.users = self.api.get_users().await?;
        self.refresh_unread().await
    }

    /// Sostituisce la cache locale con il conteggio calcolato dal server
    pub async fn refresh_unread(&mut self) -> Result<()> {
        self.unread = self.api.unread_counts().await?;
        debug!(peers = self.unread.len(), "Unread tally refreshed");
        Ok(())
    }

    /// Apre (`Some`) o chiude (`None`) la conversazione con un peer.
    ///
    /// All'apertura i messaggi del peer vengono segnati come letti e il peer
    /// sparisce dalla cache dei non letti. Alla chiusura la cache non è più
    /// affidabile e viene riletta dal server.
    #[instrument(skip(self), fields(viewer_id = self.viewer_id))]
    pub async fn select_peer(&mut self, peer: Option<i32>) -> Result<()> {
        self.selected = peer;

        match peer {
            Some(peer_id) => {
                self.messages = self.api.get_messages(peer_id).await?;
                let outcome = self.api.mark_read(peer_id).await?;
                info!(modified = outcome.modified_count, "Conversation opened");
                self.unread.remove(&peer_id);
            }
            None => {
                self.messages.clear();
                self.refresh_unread().await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self, message), fields(sender_id = message.sender_id))]
    pub async fn on_new_message(&mut self, message: Message) -> Result<()> {
        let sender_id = message.sender_id;

        match self.selected {
            Some(peer_id) if peer_id == sender_id => {
                // conversazione aperta: append, mark-read e riallineamento col server
                self.messages.push(message);
                self.api.mark_read(peer_id).await?;
                self.messages = self.api.get_messages(peer_id).await?;
            }
            None => {
                // senza conversazione aperta il conteggio locale può essere stantio
                self.refresh_unread().await?;
            }
            Some(_) => {
                *self.unread.entry(sender_id).or_insert(0) += 1;
                debug!(unread = self.unread_for(sender_id), "Unread count incremented");
            }
        }
        Ok(())
    }

    /// Spunta di lettura: solo i messaggi del viewer verso `reader_id`
    pub fn on_messages_read(&mut self, reader_id: i32) {
        let viewer_id = self.viewer_id;
        let mut flipped = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.sender_id == viewer_id && m.receiver_id == reader_id && !m.read)
        {
            message.read = true;
            flipped += 1;
        }
        debug!(reader_id, flipped, "Read receipt applied");
    }

    /// Invia un messaggio al peer della conversazione aperta
    pub async fn send(&mut self, message: &OutgoingMessage) -> Result<Message> {
        let peer_id = self.selected.ok_or(ClientError::NoConversation)?;
        let stored = self.api.send_message(peer_id, message).await?;
        self.messages.push(stored.clone());
        Ok(stored)
    }

    pub async fn handle(&mut self, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::NewMessage(message) => self.on_new_message(message).await,
            ServerEvent::MessagesRead { reader_id, count } => {
                debug!(reader_id, count, "messagesRead received");
                self.on_messages_read(reader_id);
                Ok(())
            }
            ServerEvent::Error { code, message } => {
                warn!(code, %message, "Server reported an error");
                Ok(())
            }
        }
    }

    /// Applica gli eventi dello stream finché non termina.
    ///
    /// Un evento malformato o una regola fallita vengono solo loggati;
    /// un errore del WebSocket interrompe il ciclo.
    pub async fn run<S>(&mut self, mut events: S) -> Result<()>
    where
        S: Stream<Item = Result<ServerEvent>> + Unpin,
    {
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(ClientError::Json(e)) => {
                    warn!("Discarding malformed event: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Err(e) = self.handle(event).await {
                warn!("Failed to apply event: {}", e);
            }
        }

        info!("Event stream ended");
        Ok(())
    }
}
