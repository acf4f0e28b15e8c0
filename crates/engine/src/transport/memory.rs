//! In-memory `Connection` for session and hub tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gamehub_domain::ConnectionId;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::Connection;
use crate::error::TransportError;

pub struct MemoryConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    outbound: mpsc::UnboundedSender<String>,
    writes: AtomicUsize,
    pings: AtomicUsize,
    fail_writes: AtomicBool,
    closed: CancellationToken,
}

/// The client side of a `MemoryConnection`.
pub struct MemoryPeer {
    inbound: mpsc::UnboundedSender<String>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryConnection {
    pub fn pair() -> (Arc<Self>, MemoryPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Self {
            id: ConnectionId::new(),
            inbound: Mutex::new(inbound_rx),
            outbound: outbound_tx,
            writes: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            closed: CancellationToken::new(),
        });
        let peer = MemoryPeer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        };
        (conn, peer)
    }

    /// Text frames successfully written so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Make every following write (text or ping) fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn check_writable(&self) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Io("write failed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.check_writable()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let _ = self.outbound.send(text.to_string());
        Ok(())
    }

    async fn send_ping(&self) -> Result<(), TransportError> {
        self.check_writable()?;
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = self.closed.cancelled() => Ok(None),
            frame = inbound.recv() => Ok(frame),
        }
    }

    async fn close(&self) {
        self.closed.cancel();
    }
}

impl MemoryPeer {
    /// Send a raw frame to the server.
    pub fn send(&self, text: impl Into<String>) {
        let _ = self.inbound.send(text.into());
    }

    /// Next frame from the server, decoded as JSON, or `None` after one second.
    pub async fn next_json(&mut self) -> Option<serde_json::Value> {
        let frame = tokio::time::timeout(Duration::from_secs(1), self.outbound.recv())
            .await
            .ok()??;
        serde_json::from_str(&frame).ok()
    }

    /// Skip frames until one of the given `type` arrives.
    pub async fn next_of_kind(&mut self, kind: &str) -> Option<serde_json::Value> {
        loop {
            let frame = self.next_json().await?;
            if frame["type"] == kind {
                return Some(frame);
            }
        }
    }

    /// Simulate the client going away.
    pub fn hang_up(self) {
        drop(self);
    }
}
