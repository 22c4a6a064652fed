use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use crate::dtos::WsEventDTO;

pub enum InternalSignal {
    Shutdown,
    Event(WsEventDTO),
    Error(&'static str),
}

impl InternalSignal {
    fn kind(&self) -> &'static str {
        match self {
            InternalSignal::Shutdown => "Shutdown",
            InternalSignal::Event(event) => event.name(),
            InternalSignal::Error(_) => "Error",
        }
    }
}

/// Collegamento tra un utente e la sua connessione WebSocket attiva
struct Binding {
    connection_id: u64,
    tx: UnboundedSender<InternalSignal>,
}

/// Registro di presenza: al più una connessione attiva per utente, vince l'ultima
pub struct UserMap {
    users_online: DashMap<i32, Binding>,
    next_connection_id: AtomicU64,
}

impl Default for UserMap {
    fn default() -> Self {
        Self::new()
    }
}

impl UserMap {
    pub fn new() -> Self {
        UserMap {
            users_online: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Registra `tx` come connessione di `user_id`, sostituendo quella precedente.
    /// La connessione sostituita riceve `Shutdown`.
    ///
    /// # Returns
    /// L'id della nuova connessione, da passare a `remove_from_online`
    #[instrument(skip(self, tx))]
    pub fn register_online(&self, user_id: i32, tx: UnboundedSender<InternalSignal>) -> u64 {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        info!(connection_id, "Registering user {} as online", user_id);

        let previous = self
            .users_online
            .insert(user_id, Binding { connection_id, tx });

        if let Some(old) = previous {
            info!(
                old_connection_id = old.connection_id,
                "Replacing previous connection"
            );
            // se il vecchio writer è già terminato non c'è nulla da chiudere
            let _ = old.tx.send(InternalSignal::Shutdown);
        }

        debug!("Total online users: {}", self.users_online.len());
        connection_id
    }

    /// Rimuove il binding solo se appartiene ancora a `connection_id`:
    /// la chiusura di una connessione sostituita non deve scollegare quella nuova.
    #[instrument(skip(self))]
    pub fn remove_from_online(&self, user_id: &i32, connection_id: u64) -> bool {
        let removed = self
            .users_online
            .remove_if(user_id, |_, binding| binding.connection_id == connection_id)
            .is_some();
        if removed {
            info!("Removed user from online");
        } else {
            debug!("Binding already replaced, nothing to remove");
        }
        removed
    }

    /// Trasmettitore della connessione attiva dell'utente, se presente
    pub fn lookup(&self, user_id: &i32) -> Option<UnboundedSender<InternalSignal>> {
        self.users_online.get(user_id).map(|entry| entry.tx.clone())
    }

    /// Consegna `message` alla connessione di `user_id` se online.
    ///
    /// # Returns
    /// `true` se il segnale è stato accodato, `false` se l'utente non è online
    /// o la connessione si è chiusa nel frattempo
    #[instrument(skip(self, message))]
    pub fn send_server_message_if_online(&self, user_id: &i32, message: InternalSignal) -> bool {
        let message_type = message.kind();

        match self.lookup(user_id) {
            Some(tx) => match tx.send(message) {
                Ok(()) => {
                    info!("{} message sent to online user", message_type);
                    true
                }
                Err(_) => {
                    warn!("Failed to send {} message to user, connection closed", message_type);
                    false
                }
            },
            None => {
                debug!("User {} not online, {} message not sent", user_id, message_type);
                false
            }
        }
    }

    /// Get the count of online users
    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    /// Check if a specific user is online
    pub fn is_user_online(&self, user_id: &i32) -> bool {
        self.users_online.contains_key(user_id)
    }
}
