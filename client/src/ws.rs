//! Event listener - Stream degli eventi dal WebSocket del server

use crate::error::{ClientError, Result};
use crate::types::ServerEvent;
use futures_util::{Stream, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tracing::{debug, info, instrument, warn};

/// Apre il WebSocket `ws_url` (es. `ws://localhost:3000/ws`) autenticandosi con `token`.
///
/// Lo stream restituito termina quando il server chiude la connessione,
/// ad esempio perché lo stesso utente si è collegato da un'altra parte.
#[instrument(skip(token))]
pub async fn connect_events(
    ws_url: &str,
    token: &str,
) -> Result<impl Stream<Item = Result<ServerEvent>> + Unpin + use<>> {
    let mut request = ws_url.into_client_request()?;
    let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| ClientError::InvalidToken)?;
    request.headers_mut().insert(AUTHORIZATION, value);

    let (stream, _) = connect_async(request).await?;
    info!("Connected to event stream");

    Ok(stream.filter_map(|frame| {
        future::ready(match frame {
            Ok(Message::Text(text)) => {
                Some(serde_json::from_str::<ServerEvent>(text.as_str()).map_err(ClientError::from))
            }
            Ok(Message::Close(_)) => {
                debug!("Server closed the event stream");
                None
            }
            Ok(_) => None,
            Err(e) => {
                warn!("WebSocket error: {:?}", e);
                Some(Err(ClientError::from(e)))
            }
        })
    }))
}
