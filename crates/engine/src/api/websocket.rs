//! WebSocket entry point for players.
//!
//! The handler only resolves the player's identity and hands the upgraded
//! socket to the hub. Everything after that belongs to the player's session.

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    http::{header::HeaderName, HeaderMap, HeaderValue},
    response::Response,
};
use gamehub_domain::PlayerId;
use serde::Deserialize;

use super::{ApiState, USER_ID_HEADER};
use crate::transport::{Connection, WsConnection};

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    user_id: Option<String>,
}

/// WebSocket upgrade handler - entry point for new connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> Response {
    let player_id = resolve_player_id(&headers, &params);

    let mut response = ws
        .max_message_size(state.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, player_id));

    if let Ok(value) = HeaderValue::from_str(&player_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(USER_ID_HEADER), value);
    }
    response
}

/// Header first, then the query string; anything missing or unparsable
/// gets a fresh identity.
fn resolve_player_id(headers: &HeaderMap, params: &WsParams) -> PlayerId {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.parse().ok())
        .or_else(|| params.user_id.as_deref().and_then(|raw| raw.parse().ok()))
        .unwrap_or_default()
}

async fn handle_socket(socket: WebSocket, state: ApiState, player_id: PlayerId) {
    let connection: Arc<dyn Connection> = Arc::new(WsConnection::new(socket));
    let connection_id = connection.id();

    match state.hub.connect_session(player_id, Some(connection.clone())).await {
        Ok(_) => {
            tracing::info!(%player_id, %connection_id, "WebSocket connection established");
        }
        Err(e) => {
            tracing::warn!(%player_id, %connection_id, error = %e, "Could not connect player");
            connection.close().await;
        }
    }
}
