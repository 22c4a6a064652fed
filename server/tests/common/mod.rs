#![allow(dead_code)]

use axum_test::TestServer;
use futures_util::StreamExt;
use pairchat_server::core::{AppState, encode_jwt};
use pairchat_server::dtos::{CreateUserDTO, WsEventDTO};
use pairchat_server::entities::User;
use pairchat_server::repositories::{Create, MIGRATOR, PoolType};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub const JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Gli utenti caricati da `seed_users`
pub struct TestUsers {
    pub alice: User,
    pub bob: User,
    pub charlie: User,
}

/// Database SQLite in memoria con le migrations applicate, isolato per ogni test
pub async fn create_test_pool() -> PoolType {
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

/// Crea un AppState per i test con il JWT secret di test
pub fn create_test_state(pool: PoolType) -> Arc<AppState> {
    Arc::new(AppState::new(pool, JWT_SECRET.to_string()))
}

/// Crea un TestServer (trasporto mock) sopra lo stato dato
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = pairchat_server::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Stato, server e i tre utenti alice, bob e charlie
pub async fn setup() -> (Arc<AppState>, TestServer, TestUsers) {
    let state = create_test_state(create_test_pool().await);
    let users = seed_users(&state).await;
    let server = create_test_server(state.clone());
    (state, server, users)
}

pub async fn seed_users(state: &AppState) -> TestUsers {
    let mut created = Vec::new();
    for (username, full_name) in [("alice", "Alice Rossi"), ("bob", "Bob Bianchi"), ("charlie", "Charlie Verdi")] {
        let user = state
            .user
            .create(&CreateUserDTO {
                username: username.to_string(),
                full_name: full_name.to_string(),
                password: "$2b$12$notarealhashnotarealhashnotarealhashnotarealhashnot".to_string(),
                profile_pic: Some(format!("https://cdn.example.com/{username}.png")),
            })
            .await
            .expect("Failed to seed user");
        created.push(user);
    }
    let charlie = created.pop().unwrap();
    let bob = created.pop().unwrap();
    let alice = created.pop().unwrap();
    TestUsers { alice, bob, charlie }
}

/// Genera un JWT token valido 24 ore per l'utente
pub fn create_test_jwt(user: &User) -> String {
    encode_jwt(user.username.clone(), user.user_id, JWT_SECRET).expect("Failed to create JWT token")
}

pub fn bearer(user: &User) -> String {
    format!("Bearer {}", create_test_jwt(user))
}

/// Avvia il router su una porta reale, necessario per il WebSocket
pub async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = pairchat_server::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn connect_ws(addr: SocketAddr, user: &User) -> WsStream {
    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("authorization", bearer(user).parse().unwrap());
    let (stream, _) = connect_async(request).await.expect("WebSocket handshake failed");
    stream
}

/// Attende che l'upgrade abbia registrato la connessione
pub async fn wait_online(state: &AppState, user_id: i32) {
    for _ in 0..200 {
        if state.delivery.presence().is_user_online(&user_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("user {user_id} never came online");
}

/// Prossimo evento dal socket, ignorando ping e pong
pub async fn next_event(stream: &mut WsStream) -> WsEventDTO {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).expect("invalid event"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// true se entro `millis` non arriva alcun frame di testo
pub async fn no_event_within(stream: &mut WsStream, millis: u64) -> bool {
    tokio::time::timeout(Duration::from_millis(millis), stream.next())
        .await
        .is_err()
}
