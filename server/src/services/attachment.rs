//! Attachment services - Proxy degli allegati dall'object storage
//!
//! I byte non passano mai dal database: il messaggio conserva solo URL e nome file,
//! qui il contenuto viene letto dallo storage e inoltrato in streaming.

use crate::core::{AppError, AppState};
use crate::entities::User;
use crate::repositories::Read;
use axum::{
    Extension,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const DEFAULT_FILE_NAME: &str = "file";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

struct Attachment {
    url: String,
    file_name: String,
}

/// Allegato del messaggio, visibile solo ai due partecipanti
async fn load_attachment(
    state: &AppState,
    viewer_id: i32,
    message_id: i32,
) -> Result<Attachment, AppError> {
    let message = state
        .msg
        .read(&message_id)
        .await?
        .filter(|m| m.involves(viewer_id))
        .ok_or_else(|| {
            warn!(message_id, "Message not found or not visible to user");
            AppError::not_found("File not found")
        })?;

    let url = message.file.ok_or_else(|| {
        warn!(message_id, "Message has no file attached");
        AppError::not_found("File not found")
    })?;

    Ok(Attachment {
        url,
        file_name: message
            .file_name
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
    })
}

async fn proxy_attachment(
    state: &AppState,
    attachment: Attachment,
    disposition: &str,
    content_type_override: Option<&'static str>,
) -> Result<Response, AppError> {
    debug!(url = %attachment.url, "Fetching attachment from object storage");
    let upstream = state
        .http
        .get(&attachment.url)
        .send()
        .await?
        .error_for_status()?;

    let content_type = match content_type_override {
        Some(content_type) => content_type.to_string(),
        None => upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
    };
    let content_disposition = format!("{}; filename=\"{}\"", disposition, attachment.file_name);

    info!(file_name = %attachment.file_name, "Streaming attachment");
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Response, AppError> {
    let attachment = load_attachment(&state, current_user.user_id, message_id).await?;
    proxy_attachment(&state, attachment, "attachment", None).await
}

/// Come il download ma con disposition `inline`, per l'anteprima nel browser
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn preview_attachment(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Response, AppError> {
    let attachment = load_attachment(&state, current_user.user_id, message_id).await?;
    let content_type = attachment
        .file_name
        .to_ascii_lowercase()
        .ends_with(".pdf")
        .then_some("application/pdf");
    proxy_attachment(&state, attachment, "inline", content_type).await
}
