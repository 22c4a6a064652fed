//! Delivery Channel - Publish/subscribe degli eventi verso le connessioni attive
//!
//! `subscribe` crea un canale per una nuova connessione e la registra nella
//! `UserMap`; `publish` consegna un evento alla connessione dell'utente se
//! presente, altrimenti lo scarta. Consegna best-effort, al più una volta,
//! senza ack né backlog: chi era offline recupera lo stato con le query HTTP.

use crate::dtos::WsEventDTO;
use crate::ws::usermap::{InternalSignal, UserMap};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, instrument};

/// Lato connessione di una sottoscrizione
pub struct Subscription {
    pub connection_id: u64,
    /// Usato dal task di lettura per segnalare il proprio writer
    pub sender: UnboundedSender<InternalSignal>,
    pub receiver: UnboundedReceiver<InternalSignal>,
}

#[derive(Default)]
pub struct DeliveryChannel {
    users_online: UserMap,
}

impl DeliveryChannel {
    pub fn new() -> Self {
        Self {
            users_online: UserMap::new(),
        }
    }

    /// Registro di presenza sottostante
    pub fn presence(&self) -> &UserMap {
        &self.users_online
    }

    /// Apre il canale di una nuova connessione per `user_id`, sostituendo l'eventuale precedente
    pub fn subscribe(&self, user_id: i32) -> Subscription {
        let (sender, receiver) = unbounded_channel::<InternalSignal>();
        let connection_id = self.users_online.register_online(user_id, sender.clone());
        Subscription {
            connection_id,
            sender,
            receiver,
        }
    }

    pub fn unsubscribe(&self, user_id: i32, connection_id: u64) -> bool {
        self.users_online.remove_from_online(&user_id, connection_id)
    }

    /// Consegna `event` a `user_id` se ha una connessione attiva.
    /// L'assenza di connessione non è un errore.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn publish(&self, user_id: i32, event: WsEventDTO) -> bool {
        let delivered = self
            .users_online
            .send_server_message_if_online(&user_id, InternalSignal::Event(event));
        if !delivered {
            debug!("Event dropped, recipient offline");
        }
        delivered
    }
}
