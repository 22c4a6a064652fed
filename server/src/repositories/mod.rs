//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Ogni repository gestisce le operazioni di database per una specifica entità.
//! Le query usano le funzioni runtime di sqlx (`query_as::<_, T>`) con `FromRow`,
//! così la compilazione non richiede un database raggiungibile.

pub mod message;
pub mod traits;
pub mod user;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{Create, Read};

pub use message::MessageRepository;
pub use user::UserRepository;

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;

// alias di tipo per il pool, per semplificare lo switch in caso in cui vogliamo usare un altro db
pub type PoolType = SqlitePool;

/// Migrations embedded a compile time dalla cartella `migrations/`
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Pool SQLite in memoria con le migrations applicate, isolato per ogni test
#[cfg(test)]
pub(crate) async fn test_pool() -> PoolType {
    use sqlx::sqlite::SqlitePoolOptions;

    // una sola connessione: ogni connessione a `sqlite::memory:` vede un database diverso
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");
    pool
}
