//! Application State - Stato dell'applicazione
//!
//! Contiene i repository, la configurazione e il canale di consegna real-time.
//! Viene costruito esplicitamente e passato al router, così ogni test
//! può creare istanze isolate.

use crate::repositories::{MessageRepository, PoolType, UserRepository};
use crate::ws::delivery::DeliveryChannel;

/// Stato condiviso tra tutte le route e middleware
pub struct AppState {
    /// Repository per la gestione degli utenti
    pub user: UserRepository,

    /// Repository per la gestione dei messaggi
    pub msg: MessageRepository,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Registro delle connessioni WebSocket attive e publish degli eventi
    pub delivery: DeliveryChannel,

    /// Client HTTP verso l'object storage degli allegati
    pub http: reqwest::Client,
}

impl AppState {
    /// Crea una nuova istanza di AppState inizializzando tutti i repository
    /// con il pool di connessioni fornito e la JWT secret.
    ///
    /// # Arguments
    /// * `pool` - Pool di connessioni condiviso
    /// * `jwt_secret` - Chiave segreta per la verifica dei token JWT
    pub fn new(pool: PoolType, jwt_secret: String) -> Self {
        Self {
            user: UserRepository::new(pool.clone()),
            msg: MessageRepository::new(pool),
            jwt_secret,
            delivery: DeliveryChannel::new(),
            http: reqwest::Client::new(),
        }
    }
}
