//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use gamehub_domain::{GameId, GameName};
use gamehub_shared::GameCreatedPayload;

use super::ApiState;
use crate::error::HubError;

/// Create all HTTP routes.
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game).delete(delete_game))
}

async fn health() -> &'static str {
    "ok"
}

async fn list_games(State(state): State<ApiState>) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.hub.list_games().await?))
}

/// The request body is the game name; blank gets the default name.
async fn create_game(
    State(state): State<ApiState>,
    body: String,
) -> Result<(StatusCode, Json<GameCreatedPayload>), ApiError> {
    let (id, name) = state.hub.create_game(GameName::or_default(body)).await?;
    Ok((StatusCode::CREATED, Json(GameCreatedPayload { id, name })))
}

async fn get_game(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let game = match id.parse::<GameId>() {
        Ok(game_id) => state.hub.game(game_id).await,
        Err(_) => None,
    }
    .ok_or(ApiError::NotFound)?;

    let view = game
        .public_view()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(view))
}

async fn delete_game(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.hub.remove_game(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<HubError> for ApiError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::EmptyId => ApiError::BadRequest(e.to_string()),
            HubError::GameNotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}
