//! API layer - HTTP and WebSocket entry points.

pub mod http;
pub mod websocket;

use std::sync::Arc;

use axum::http::header::HeaderName;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::hub::Hub;

/// Header carrying a player's identity in both directions.
pub const USER_ID_HEADER: &str = "x-user-id";

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub hub: Arc<Hub>,
    pub max_message_bytes: usize,
}

/// Build the full router: HTTP routes, the `/ws` upgrade, tracing and CORS.
pub fn router(hub: Arc<Hub>, config: &ServerConfig) -> Router {
    let state = ApiState {
        hub,
        max_message_bytes: config.max_message_bytes,
    };

    let mut router = http::routes()
        .route("/ws", get(websocket::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer(config.cors_allowed_origins.as_deref()) {
        router = router.layer(cors);
    }
    router
}

fn build_cors_layer(allowed_origins: Option<&str>) -> Option<CorsLayer> {
    let allowed_origins = allowed_origins.map(str::trim).filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        // Players send X-User-Id, which triggers a preflight.
        .allow_headers([
            HeaderName::from_static(USER_ID_HEADER),
            axum::http::header::CONTENT_TYPE,
        ])
        .expose_headers([HeaderName::from_static(USER_ID_HEADER)]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_is_off_unless_configured() {
        assert!(build_cors_layer(None).is_none());
        assert!(build_cors_layer(Some("  ")).is_none());
        assert!(build_cors_layer(Some(" , ")).is_none());
    }

    #[test]
    fn cors_accepts_wildcard_and_lists() {
        assert!(build_cors_layer(Some("*")).is_some());
        assert!(build_cors_layer(Some("http://localhost:3000, https://moose.example")).is_some());
    }
}
