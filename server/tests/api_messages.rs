//! Integration tests per gli endpoints delle conversazioni
//!
//! Test per:
//! - GET /messages/{peer_id}
//! - POST /messages/send/{peer_id}
//! - POST /messages/read/{peer_id}
//! - GET /messages/unread/counts
//! - GET /messages/last-messages

mod common;

#[cfg(test)]
mod message_tests {
    use super::common::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use axum_test::http::HeaderName;
    use pairchat_server::dtos::{MarkReadDTO, MessageDTO};
    use pairchat_server::entities::User;
    use serde_json::{Value, json};

    fn auth() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    async fn send_text(server: &TestServer, from: &User, to: &User, text: &str) -> MessageDTO {
        let response = server
            .post(&format!("/messages/send/{}", to.user_id))
            .add_header(auth(), bearer(from))
            .json(&json!({ "text": text }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn unread_counts(server: &TestServer, viewer: &User) -> Value {
        let response = server
            .get("/messages/unread/counts")
            .add_header(auth(), bearer(viewer))
            .await;
        response.assert_status_ok();
        response.json()
    }

    // ============================================================
    // Test per POST /messages/send/{peer_id}
    // ============================================================

    #[tokio::test]
    async fn test_send_message_returns_created_record() {
        let (_state, server, users) = setup().await;

        let message = send_text(&server, &users.alice, &users.bob, "hi").await;

        assert_eq!(message.sender_id, users.alice.user_id);
        assert_eq!(message.receiver_id, users.bob.user_id);
        assert_eq!(message.text.as_deref(), Some("hi"));
        assert!(!message.read);
        assert_eq!(message.created_at, message.updated_at);
    }

    #[tokio::test]
    async fn test_send_message_with_attachment_reference() {
        let (_state, server, users) = setup().await;

        let response = server
            .post(&format!("/messages/send/{}", users.bob.user_id))
            .add_header(auth(), bearer(&users.alice))
            .json(&json!({
                "file": "https://files.example.com/raw/upload/abc123",
                "fileName": "contract.pdf"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["file"], "https://files.example.com/raw/upload/abc123");
        assert_eq!(body["fileName"], "contract.pdf");
        assert_eq!(body["text"], Value::Null);
        assert_eq!(body["read"], false);
    }

    #[tokio::test]
    async fn test_send_message_validation_errors() {
        let (_state, server, users) = setup().await;
        let path = format!("/messages/send/{}", users.bob.user_id);

        let invalid_bodies = [
            json!({}),
            json!({ "text": "" }),
            json!({ "text": "x".repeat(5001) }),
            json!({ "image": "not a url" }),
            json!({ "file": "https://files.example.com/a", "fileName": "../secret" }),
            json!({ "file": "https://files.example.com/a", "fileName": "evil\".pdf" }),
        ];

        for body in invalid_bodies {
            let response = server
                .post(&path)
                .add_header(auth(), bearer(&users.alice))
                .json(&body)
                .await;
            response.assert_status_bad_request();
            let error: Value = response.json();
            assert_eq!(error["error"], "Validation error");
        }
    }

    #[tokio::test]
    async fn test_send_message_to_self_is_rejected() {
        let (_state, server, users) = setup().await;

        let response = server
            .post(&format!("/messages/send/{}", users.alice.user_id))
            .add_header(auth(), bearer(&users.alice))
            .json(&json!({ "text": "me" }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_send_message_to_unknown_user() {
        let (_state, server, users) = setup().await;

        let response = server
            .post("/messages/send/9999")
            .add_header(auth(), bearer(&users.alice))
            .json(&json!({ "text": "hello?" }))
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_malformed_peer_id_is_bad_request() {
        let (_state, server, users) = setup().await;

        let response = server
            .post("/messages/read/not-an-id")
            .add_header(auth(), bearer(&users.alice))
            .await;

        response.assert_status_bad_request();
    }

    // ============================================================
    // Test per GET /messages/{peer_id}
    // ============================================================

    #[tokio::test]
    async fn test_conversation_both_directions_in_order() {
        let (_state, server, users) = setup().await;

        send_text(&server, &users.alice, &users.bob, "1").await;
        send_text(&server, &users.bob, &users.alice, "2").await;
        send_text(&server, &users.alice, &users.charlie, "not for bob").await;
        send_text(&server, &users.charlie, &users.alice, "not for bob either").await;
        send_text(&server, &users.alice, &users.bob, "3").await;

        let response = server
            .get(&format!("/messages/{}", users.bob.user_id))
            .add_header(auth(), bearer(&users.alice))
            .await;

        response.assert_status_ok();
        let messages: Vec<MessageDTO> = response.json();
        let texts: Vec<_> = messages.iter().filter_map(|m| m.text.as_deref()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert!(messages.iter().all(|m| {
            m.sender_id != users.charlie.user_id && m.receiver_id != users.charlie.user_id
        }));

        // la stessa conversazione vista dall'altro lato
        let response = server
            .get(&format!("/messages/{}", users.alice.user_id))
            .add_header(auth(), bearer(&users.bob))
            .await;
        let from_bob: Vec<MessageDTO> = response.json();
        assert_eq!(from_bob, messages);
    }

    #[tokio::test]
    async fn test_conversation_with_unknown_user() {
        let (_state, server, users) = setup().await;

        let response = server
            .get("/messages/4242")
            .add_header(auth(), bearer(&users.alice))
            .await;

        response.assert_status_not_found();
    }

    // ============================================================
    // Test per read state e unread counts
    // ============================================================

    #[tokio::test]
    async fn test_unread_then_open_conversation_scenario() {
        let (_state, server, users) = setup().await;
        let alice_key = users.alice.user_id.to_string();

        for text in ["one", "two", "three"] {
            send_text(&server, &users.alice, &users.bob, text).await;
        }

        let counts = unread_counts(&server, &users.bob).await;
        assert_eq!(counts[&alice_key], 3);
        // il mittente non ha nulla da leggere
        assert_eq!(unread_counts(&server, &users.alice).await, json!({}));

        let response = server
            .post(&format!("/messages/read/{}", users.alice.user_id))
            .add_header(auth(), bearer(&users.bob))
            .await;
        response.assert_status_ok();
        let result: MarkReadDTO = response.json();
        assert!(result.success);
        assert_eq!(result.modified_count, 3);

        let counts = unread_counts(&server, &users.bob).await;
        assert!(counts.get(&alice_key).is_none());

        // idempotente: la seconda chiamata non cambia nulla
        let response = server
            .post(&format!("/messages/read/{}", users.alice.user_id))
            .add_header(auth(), bearer(&users.bob))
            .await;
        let result: MarkReadDTO = response.json();
        assert_eq!(result.modified_count, 0);
    }

    #[tokio::test]
    async fn test_mark_read_only_flips_peer_to_caller() {
        let (_state, server, users) = setup().await;

        send_text(&server, &users.alice, &users.bob, "a->b").await;
        send_text(&server, &users.bob, &users.alice, "b->a").await;
        send_text(&server, &users.charlie, &users.bob, "c->b").await;

        let response = server
            .post(&format!("/messages/read/{}", users.alice.user_id))
            .add_header(auth(), bearer(&users.bob))
            .await;
        let result: MarkReadDTO = response.json();
        assert_eq!(result.modified_count, 1);

        let counts = unread_counts(&server, &users.bob).await;
        assert_eq!(counts, json!({ users.charlie.user_id.to_string(): 1 }));
        let counts = unread_counts(&server, &users.alice).await;
        assert_eq!(counts, json!({ users.bob.user_id.to_string(): 1 }));
    }

    #[tokio::test]
    async fn test_read_flag_is_monotonic() {
        let (_state, server, users) = setup().await;

        send_text(&server, &users.alice, &users.bob, "first").await;
        server
            .post(&format!("/messages/read/{}", users.alice.user_id))
            .add_header(auth(), bearer(&users.bob))
            .await
            .assert_status_ok();
        send_text(&server, &users.alice, &users.bob, "second").await;

        let messages: Vec<MessageDTO> = server
            .get(&format!("/messages/{}", users.bob.user_id))
            .add_header(auth(), bearer(&users.alice))
            .await
            .json();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].read);
        assert!(!messages[1].read);

        // altra lettura: il primo resta letto, il secondo diventa letto
        server
            .post(&format!("/messages/read/{}", users.alice.user_id))
            .add_header(auth(), bearer(&users.bob))
            .await
            .assert_status_ok();
        let messages: Vec<MessageDTO> = server
            .get(&format!("/messages/{}", users.bob.user_id))
            .add_header(auth(), bearer(&users.alice))
            .await
            .json();
        assert!(messages.iter().all(|m| m.read));
    }

    #[tokio::test]
    async fn test_unread_counts_match_stored_messages() {
        let (_state, server, users) = setup().await;
        let everyone = [&users.alice, &users.bob, &users.charlie];

        // sequenza deterministica di invii e letture su tutte le coppie
        for round in 0..4 {
            for sender in everyone {
                for receiver in everyone {
                    if sender.user_id != receiver.user_id && (sender.user_id + round) % 2 == 0 {
                        send_text(&server, sender, receiver, "tick").await;
                    }
                }
            }
            if round == 1 {
                server
                    .post(&format!("/messages/read/{}", users.alice.user_id))
                    .add_header(auth(), bearer(&users.charlie))
                    .await
                    .assert_status_ok();
            }
        }

        for viewer in everyone {
            let counts = unread_counts(&server, viewer).await;
            for peer in everyone {
                if peer.user_id == viewer.user_id {
                    continue;
                }
                let messages: Vec<MessageDTO> = server
                    .get(&format!("/messages/{}", peer.user_id))
                    .add_header(auth(), bearer(viewer))
                    .await
                    .json();
                let expected = messages
                    .iter()
                    .filter(|m| m.sender_id == peer.user_id && m.receiver_id == viewer.user_id && !m.read)
                    .count() as i64;
                let actual = counts
                    .get(peer.user_id.to_string())
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                assert_eq!(actual, expected, "viewer {} peer {}", viewer.username, peer.username);
            }
        }
    }

    // ============================================================
    // Test per GET /messages/last-messages
    // ============================================================

    #[tokio::test]
    async fn test_last_message_per_conversation() {
        let (_state, server, users) = setup().await;

        send_text(&server, &users.alice, &users.bob, "old").await;
        send_text(&server, &users.bob, &users.alice, "newest with bob").await;
        send_text(&server, &users.charlie, &users.alice, "only with charlie").await;

        let response = server
            .get("/messages/last-messages")
            .add_header(auth(), bearer(&users.alice))
            .await;

        response.assert_status_ok();
        let last: Value = response.json();
        assert_eq!(last[users.bob.user_id.to_string()]["text"], "newest with bob");
        assert_eq!(last[users.charlie.user_id.to_string()]["text"], "only with charlie");
        assert_eq!(last.as_object().unwrap().len(), 2);
    }

    // ============================================================
    // Autenticazione
    // ============================================================

    #[tokio::test]
    async fn test_requests_without_token_are_forbidden() {
        let (_state, server, _users) = setup().await;

        server.get("/messages/unread/counts").await.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_requests_with_invalid_token_are_unauthorized() {
        let (_state, server, _users) = setup().await;

        server
            .get("/messages/unread/counts")
            .add_header(auth(), "Bearer invalid_token_here")
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_token_for_unknown_user_is_unauthorized() {
        let (_state, server, _users) = setup().await;
        let ghost = User {
            user_id: 77,
            username: "ghost".to_string(),
            full_name: "Ghost".to_string(),
            password: String::new(),
            profile_pic: None,
            created_at: chrono::Utc::now(),
        };

        server
            .get("/messages/users")
            .add_header(auth(), bearer(&ghost))
            .await
            .assert_status_unauthorized();
    }

    // ============================================================
    // Errori dello store
    // ============================================================

    /// Database bloccato da un'altra connessione: errore transitorio, 5xx e non 400
    #[tokio::test]
    async fn test_locked_store_is_server_error() {
        use pairchat_server::repositories::MIGRATOR;
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
        use sqlx::{ConnectOptions, Connection};
        use std::time::{Duration, SystemTime, UNIX_EPOCH};

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "pairchat-locked-{}-{}.db",
            std::process::id(),
            nanos
        ));
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .busy_timeout(Duration::ZERO);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .unwrap();
        MIGRATOR.run(&pool).await.unwrap();
        let state = create_test_state(pool);
        let users = seed_users(&state).await;
        let server = create_test_server(state);

        // un'altra connessione tiene il lock esclusivo sul file
        let mut locker = options.connect().await.unwrap();
        sqlx::query("BEGIN EXCLUSIVE")
            .execute(&mut locker)
            .await
            .unwrap();

        let response = server
            .get("/messages/unread/counts")
            .add_header(auth(), bearer(&users.bob))
            .await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        sqlx::query("ROLLBACK").execute(&mut locker).await.unwrap();
        locker.close().await.unwrap();

        // a lock rilasciato la stessa richiesta torna a funzionare
        server
            .get("/messages/unread/counts")
            .add_header(auth(), bearer(&users.bob))
            .await
            .assert_status_ok();

        let _ = std::fs::remove_file(&path);
    }
}
