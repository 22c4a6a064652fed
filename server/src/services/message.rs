//! Message services - Conversazioni, invio, conferme di lettura e contatori

use crate::core::{AppError, AppState};
use crate::dtos::{CreateMessageDTO, MarkReadDTO, MessageDTO, SendMessageDTO, WsEventDTO};
use crate::entities::User;
use crate::repositories::Create;
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Verifica che il peer esista, altrimenti NOT_FOUND
async fn ensure_peer_exists(state: &AppState, peer_id: i32) -> Result<(), AppError> {
    if state.user.exists(&peer_id).await? {
        Ok(())
    } else {
        warn!(peer_id, "Peer user not found");
        Err(AppError::not_found("User not found"))
    }
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(peer_id): Path<i32>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    debug!("Fetching conversation");
    ensure_peer_exists(&state, peer_id).await?;

    let messages = state
        .msg
        .find_conversation(&current_user.user_id, &peer_id)
        .await?;

    info!("Retrieved {} messages", messages.len());
    Ok(Json(messages.into_iter().map(MessageDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(peer_id): Path<i32>,
    Json(body): Json<SendMessageDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Sending message");
    // 1. Validare il body (lunghezza testo, URL degli allegati, nome file, almeno un contenuto)
    body.validate()?;
    body.validate_payload()?;

    // 2. Il destinatario deve essere un altro utente esistente
    if peer_id == current_user.user_id {
        warn!("Attempted to send a message to self");
        return Err(AppError::bad_request("Cannot send a message to yourself"));
    }
    ensure_peer_exists(&state, peer_id).await?;

    // 3. Salvare il messaggio, id e timestamp li assegna lo store
    let message = state
        .msg
        .create(&CreateMessageDTO::from_send(current_user.user_id, peer_id, body))
        .await?;
    let dto = MessageDTO::from(message);
    info!(message_id = dto.id, "Message stored");

    // 4. Notificare il destinatario se è online, altrimenti lo vedrà alla prossima query
    state
        .delivery
        .publish(peer_id, WsEventDTO::NewMessage(dto.clone()));

    Ok((StatusCode::CREATED, Json(dto)))
}

/// Il chiamante ha letto i messaggi ricevuti da `peer_id`
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn mark_conversation_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(peer_id): Path<i32>,
) -> Result<Json<MarkReadDTO>, AppError> {
    debug!("Marking conversation as read");
    ensure_peer_exists(&state, peer_id).await?;

    // solo i messaggi peer -> chiamante ancora non letti
    let modified_count = state.msg.mark_read(&peer_id, &current_user.user_id).await?;
    info!(modified_count, "Messages marked as read");

    // conferma di lettura verso il mittente
    state.delivery.publish(
        peer_id,
        WsEventDTO::MessagesRead {
            reader_id: current_user.user_id,
            count: modified_count,
        },
    );

    Ok(Json(MarkReadDTO {
        success: true,
        modified_count,
    }))
}

/// Mappa peer -> numero di messaggi non letti per il chiamante, calcolata al momento
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_unread_counts(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<BTreeMap<i32, i64>>, AppError> {
    let tally = state.msg.unread_tally(&current_user.user_id).await?;
    debug!(peers = tally.len(), "Unread tally computed");
    Ok(Json(tally))
}

/// Mappa peer -> ultimo messaggio scambiato, per l'anteprima nella sidebar
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_last_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<BTreeMap<i32, MessageDTO>>, AppError> {
    let viewer = current_user.user_id;
    let last = state
        .msg
        .last_messages(&viewer)
        .await?
        .into_iter()
        .map(|m| (m.peer_of(viewer), MessageDTO::from(m)))
        .collect::<BTreeMap<_, _>>();
    debug!(conversations = last.len(), "Last messages loaded");
    Ok(Json(last))
}
