//! WebSocket Connection Management - Gestione connessioni WebSocket

use crate::dtos::WsEventDTO;
use crate::ws::delivery::Subscription;
use crate::{AppState, ws::usermap::InternalSignal};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, instrument, warn};

#[instrument(skip(ws, state))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user_id: i32) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    // Registriamo la connessione: da qui in poi gli eventi per l'utente arrivano su `receiver`
    let Subscription {
        connection_id,
        sender,
        receiver,
    } = state.delivery.subscribe(user_id);
    info!(connection_id, "User registered as online");

    // task in ascolto del websocket
    tokio::spawn(listen_ws(user_id, connection_id, ws_rx, sender, state));

    // task che scrive sul websocket gli eventi ricevuti dal canale interno
    tokio::spawn(write_ws(user_id, ws_tx, receiver));
}

#[instrument(skip(websocket_tx, internal_rx))]
pub async fn write_ws(
    user_id: i32,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
) {
    info!("Write task started");

    loop {
        match internal_rx.recv().await {
            Some(InternalSignal::Event(event)) => {
                debug!(event = event.name(), "Forwarding event to client");
                if send_event(&mut websocket_tx, &event).await.is_err() {
                    warn!("Failed to send event, closing connection");
                    break;
                }
            }
            Some(InternalSignal::Error(err_msg)) => {
                warn!(error_message = err_msg, "Sending error message to client");
                let event = WsEventDTO::Error {
                    code: 400,
                    message: err_msg.to_string(),
                };
                if send_event(&mut websocket_tx, &event).await.is_err() {
                    break;
                }
            }
            Some(InternalSignal::Shutdown) => {
                info!("Shutdown signal received");
                let _ = websocket_tx.send(Message::Close(None)).await;
                break;
            }
            None => {
                info!("Internal channel closed");
                break; // nessun mittente rimasto, la connessione è finita
            }
        }
    }

    info!("Write task terminated");
}

async fn send_event(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    event: &WsEventDTO,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(|e| {
        error!("Failed to serialize event: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|e| {
            error!("Failed to send event through WebSocket: {:?}", e);
            e
        })
}

#[instrument(skip(websocket_rx, internal_tx, state))]
pub async fn listen_ws(
    user_id: i32,
    connection_id: u64,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Listen task started");

    while let Some(msg_result) = websocket_rx.next().await {
        let msg = match msg_result {
            Ok(m) => m,
            Err(e) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
        };

        match msg {
            Message::Text(_) | Message::Binary(_) => {
                // l'invio dei messaggi passa dalle API HTTP, il socket è solo in uscita
                warn!("Unexpected frame from client");
                let _ = internal_tx.send(InternalSignal::Error(
                    "Messages must be sent through POST /messages/send/{peer_id}",
                ));
            }
            Message::Close(_) => {
                info!("Close message received");
                break;
            }
            _ => {}
        }
    }

    // Cleanup
    info!("Cleaning up connection");
    let _ = internal_tx.send(InternalSignal::Shutdown);
    state.delivery.unsubscribe(user_id, connection_id);
    info!("Listen task terminated");
}
