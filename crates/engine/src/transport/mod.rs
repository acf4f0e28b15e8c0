//! Transport port - one physical duplex link to a player.
//!
//! Sessions only ever see `Arc<dyn Connection>`. Write deadlines are applied
//! by the caller with `tokio::time::timeout`; a connection that fails a read
//! or a write is discarded.

mod websocket;

#[cfg(test)]
pub mod memory;

pub use websocket::WsConnection;

use async_trait::async_trait;
use gamehub_domain::ConnectionId;

use crate::error::TransportError;

#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Deliver one text frame.
    async fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Deliver a liveness probe.
    async fn send_ping(&self) -> Result<(), TransportError>;

    /// Next text frame. `Ok(None)` means the peer closed the link.
    async fn recv(&self) -> Result<Option<String>, TransportError>;

    async fn close(&self);
}
