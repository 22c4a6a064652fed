//! User services - Elenco contatti

use crate::core::{AppError, AppState};
use crate::dtos::UserDTO;
use crate::entities::User;
use axum::{
    Extension,
    extract::{Json, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_users_for_sidebar(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<UserDTO>>, AppError> {
    debug!("Listing users for sidebar");
    // tutti gli utenti tranne il chiamante, senza campi di credenziali
    let users = state.user.find_all_except(&current_user.user_id).await?;
    info!("Found {} users", users.len());
    Ok(Json(users.into_iter().map(UserDTO::from).collect()))
}
