//! Player session - one logical player over any number of connections.
//!
//! A session is split in two:
//!
//! - `PlayerSession` - a cheap clonable handle. Every request goes through a
//!   bounded channel and waits at most `request_timeout`.
//! - `SessionLoop` - the single task that owns the connection set and the
//!   profile. All mutation happens here, so neither needs a lock.
//!
//! Each attached connection gets its own inbound reader (see `reader`),
//! tracked on the lobby's `TaskTracker` and cancelled by the loop when the
//! connection is removed or the session stops.

mod names;
mod reader;

pub use names::placeholder_name;
pub use reader::InboundRouter;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::join_all;
use gamehub_domain::{ConnectionId, PlayerId, PlayerName};
use gamehub_shared::{kinds, EventChannel, MessageToPlayer, NameChangedPayload};
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::HubConfig;
use crate::error::SessionError;
use crate::transport::Connection;

/// Slots in the attach, detach and control queues.
const REQUEST_QUEUE: usize = 16;

/// Shortest keep-alive period the loop will tick at.
const MIN_KEEP_ALIVE: Duration = Duration::from_millis(1);

/// Per-session timing and capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub write_deadline: Duration,
    pub request_timeout: Duration,
    pub mailbox_capacity: usize,
}

impl From<&HubConfig> for SessionConfig {
    fn from(config: &HubConfig) -> Self {
        Self {
            write_deadline: config.write_deadline,
            request_timeout: config.request_timeout,
            mailbox_capacity: config.mailbox_capacity,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&HubConfig::default())
    }
}

/// The loop's authoritative view at one instant.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub connections: usize,
    /// When the last connection went away; `None` while connected.
    pub idle_since: Option<Instant>,
    pub name: PlayerName,
}

struct AttachRequest {
    connection: Arc<dyn Connection>,
    accepted: oneshot::Sender<()>,
}

enum Control {
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Rename(PlayerName),
    RetireIfIdle {
        idle_for: Duration,
        reply: oneshot::Sender<bool>,
    },
}

struct Shared {
    id: PlayerId,
    attach_tx: mpsc::Sender<AttachRequest>,
    detach_tx: mpsc::Sender<ConnectionId>,
    mailbox_tx: mpsc::Sender<MessageToPlayer>,
    control_tx: mpsc::Sender<Control>,
    name_rx: watch::Receiver<PlayerName>,
    cancel: CancellationToken,
    done: CancellationToken,
    request_timeout: Duration,
}

/// Handle to one player's session.
#[derive(Clone)]
pub struct PlayerSession {
    shared: Arc<Shared>,
}

impl PlayerSession {
    /// Create a session handle and the loop that serves it. The loop does
    /// nothing until `SessionLoop::run` is spawned.
    pub fn new(
        id: PlayerId,
        name: PlayerName,
        config: &SessionConfig,
        router: Weak<dyn InboundRouter>,
        tracker: TaskTracker,
    ) -> (Self, SessionLoop) {
        let (attach_tx, attach_rx) = mpsc::channel(REQUEST_QUEUE);
        let (detach_tx, detach_rx) = mpsc::channel(REQUEST_QUEUE);
        let (control_tx, control_rx) = mpsc::channel(REQUEST_QUEUE);
        let (mailbox_tx, mailbox_rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let (name_tx, name_rx) = watch::channel(name);

        let session = Self {
            shared: Arc::new(Shared {
                id,
                attach_tx,
                detach_tx,
                mailbox_tx,
                control_tx,
                name_rx,
                cancel: CancellationToken::new(),
                done: CancellationToken::new(),
                request_timeout: config.request_timeout,
            }),
        };

        let run_loop = SessionLoop {
            session: session.clone(),
            attach_rx,
            detach_rx,
            mailbox_rx,
            control_rx,
            name_tx,
            connections: HashMap::new(),
            idle_since: Some(Instant::now()),
            write_deadline: config.write_deadline,
            router,
            tracker,
        };

        (session, run_loop)
    }

    pub fn id(&self) -> PlayerId {
        self.shared.id
    }

    /// Current display name as last published by the loop.
    pub fn display_name(&self) -> PlayerName {
        self.shared.name_rx.borrow().clone()
    }

    /// Whether both handles point at the same session instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.cancel.is_cancelled() || self.shared.done.is_cancelled()
    }

    /// Hand a connection to the loop, which starts its inbound reader.
    ///
    /// # Errors
    ///
    /// `AttachTimeout` if the loop did not take it within the request
    /// timeout, `Stopped` if the session has ended.
    pub async fn attach(&self, connection: Arc<dyn Connection>) -> Result<(), SessionError> {
        if self.is_stopped() {
            return Err(SessionError::Stopped);
        }
        let wait = self.shared.request_timeout;
        let (accepted, ack) = oneshot::channel();

        self.shared
            .attach_tx
            .send_timeout(AttachRequest { connection, accepted }, wait)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SessionError::AttachTimeout,
                SendTimeoutError::Closed(_) => SessionError::Stopped,
            })?;

        match tokio::time::timeout(wait, ack).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SessionError::Stopped),
            Err(_) => Err(SessionError::AttachTimeout),
        }
    }

    /// Ask the loop to drop a connection. Detaching an unknown connection,
    /// or detaching from a stopped session, is a no-op.
    pub async fn detach(&self, connection_id: ConnectionId) -> Result<(), SessionError> {
        match self
            .shared
            .detach_tx
            .send_timeout(connection_id, self.shared.request_timeout)
            .await
        {
            Ok(()) | Err(SendTimeoutError::Closed(_)) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(SessionError::DetachTimeout),
        }
    }

    /// Queue messages for every attached connection, in order.
    ///
    /// Every message is checked for a channel tag before any is queued.
    pub async fn send(
        &self,
        messages: impl IntoIterator<Item = MessageToPlayer>,
    ) -> Result<(), SessionError> {
        let messages: Vec<MessageToPlayer> = messages.into_iter().collect();
        if messages.iter().any(|m| !m.has_channel()) {
            return Err(SessionError::MissingChannelTag);
        }
        if self.is_stopped() {
            return Err(SessionError::Stopped);
        }
        for message in messages {
            self.shared
                .mailbox_tx
                .send_timeout(message, self.shared.request_timeout)
                .await
                .map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => SessionError::SendTimeout,
                    SendTimeoutError::Closed(_) => SessionError::Stopped,
                })?;
        }
        Ok(())
    }

    /// Send a `PRIVATE` error reply, logging if it cannot be queued.
    pub async fn reply_error(&self, error: impl fmt::Display, original: Option<String>) {
        let reply = MessageToPlayer::error(&error, original);
        if let Err(e) = self.send([reply]).await {
            tracing::warn!(player_id = %self.id(), error = %e, "Could not deliver error reply");
        }
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, answer) = oneshot::channel();
        self.control(Control::Snapshot(reply)).await?;
        self.await_answer(answer).await
    }

    /// Number of attached connections, as seen by the loop.
    pub async fn total_connections(&self) -> Result<usize, SessionError> {
        Ok(self.snapshot().await?.connections)
    }

    /// Change the display name; the loop confirms with `NAME_CHANGED`.
    pub async fn rename(&self, name: PlayerName) -> Result<(), SessionError> {
        self.control(Control::Rename(name)).await
    }

    /// Stop the session if it has had no connection for at least
    /// `idle_for`. Returns whether it stopped.
    pub async fn retire_if_idle(&self, idle_for: Duration) -> Result<bool, SessionError> {
        let (reply, answer) = oneshot::channel();
        self.control(Control::RetireIfIdle { idle_for, reply }).await?;
        self.await_answer(answer).await
    }

    /// Signal the loop to stop. Use `stopped` to wait for it.
    pub fn stop(&self) {
        self.shared.cancel.cancel();
    }

    /// Resolves once the loop has released its connections and exited.
    pub async fn stopped(&self) {
        self.shared.done.cancelled().await;
    }

    async fn control(&self, control: Control) -> Result<(), SessionError> {
        self.shared
            .control_tx
            .send_timeout(control, self.shared.request_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SessionError::QueryTimeout,
                SendTimeoutError::Closed(_) => SessionError::Stopped,
            })
    }

    async fn await_answer<T>(&self, answer: oneshot::Receiver<T>) -> Result<T, SessionError> {
        match tokio::time::timeout(self.shared.request_timeout, answer).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(SessionError::Stopped),
            Err(_) => Err(SessionError::QueryTimeout),
        }
    }
}

impl fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerSession")
            .field("id", &self.shared.id)
            .field("name", &*self.shared.name_rx.borrow())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

struct Attached {
    connection: Arc<dyn Connection>,
    reader: CancellationToken,
}

/// The control loop of one session. Consumed by `run`.
pub struct SessionLoop {
    session: PlayerSession,
    attach_rx: mpsc::Receiver<AttachRequest>,
    detach_rx: mpsc::Receiver<ConnectionId>,
    mailbox_rx: mpsc::Receiver<MessageToPlayer>,
    control_rx: mpsc::Receiver<Control>,
    name_tx: watch::Sender<PlayerName>,
    connections: HashMap<ConnectionId, Attached>,
    idle_since: Option<Instant>,
    write_deadline: Duration,
    router: Weak<dyn InboundRouter>,
    tracker: TaskTracker,
}

impl SessionLoop {
    /// Serve the session until it is stopped, pinging every connection each
    /// `keep_alive`.
    ///
    /// Attach requests are served ahead of the mailbox. A message reaches the
    /// connections attached when the loop dequeues it, so a connection that
    /// attaches while messages are still queued receives them too.
    pub async fn run(mut self, keep_alive: Duration) {
        let player_id = self.session.id();
        let keep_alive = keep_alive.max(MIN_KEEP_ALIVE);
        let cancel = self.session.shared.cancel.clone();
        let _done = self.session.shared.done.clone().drop_guard();

        let mut keep_alive_ticker = tokio::time::interval_at(Instant::now() + keep_alive, keep_alive);
        keep_alive_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(%player_id, "Session loop started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(request) = self.attach_rx.recv() => self.accept(request),
                Some(connection_id) = self.detach_rx.recv() => self.remove(connection_id).await,
                Some(control) = self.control_rx.recv() => self.handle_control(control, &cancel).await,
                Some(message) = self.mailbox_rx.recv() => self.deliver(&message).await,
                _ = keep_alive_ticker.tick() => self.probe().await,
            }
        }

        self.release().await;
        tracing::debug!(%player_id, "Session loop stopped");
    }

    fn accept(&mut self, request: AttachRequest) {
        let AttachRequest {
            connection,
            accepted,
        } = request;
        let connection_id = connection.id();

        if accepted.send(()).is_err() {
            tracing::debug!(player_id = %self.session.id(), %connection_id, "Attach abandoned by caller");
            return;
        }

        let reader = CancellationToken::new();
        self.tracker.spawn(reader::read_inbound(
            self.session.clone(),
            connection.clone(),
            self.router.clone(),
            reader.clone(),
        ));
        if let Some(previous) = self.connections.insert(connection_id, Attached { connection, reader }) {
            previous.reader.cancel();
        }
        self.idle_since = None;

        tracing::debug!(
            player_id = %self.session.id(),
            %connection_id,
            total = self.connections.len(),
            "Connection attached"
        );
    }

    async fn remove(&mut self, connection_id: ConnectionId) {
        let Some(attached) = self.connections.remove(&connection_id) else {
            return;
        };
        attached.reader.cancel();
        let _ = tokio::time::timeout(self.write_deadline, attached.connection.close()).await;
        if self.connections.is_empty() {
            self.idle_since = Some(Instant::now());
        }

        tracing::debug!(
            player_id = %self.session.id(),
            %connection_id,
            total = self.connections.len(),
            "Connection detached"
        );
    }

    async fn handle_control(&mut self, control: Control, cancel: &CancellationToken) {
        match control {
            Control::Snapshot(reply) => {
                let _ = reply.send(SessionSnapshot {
                    connections: self.connections.len(),
                    idle_since: self.idle_since,
                    name: self.name_tx.borrow().clone(),
                });
            }
            Control::Rename(name) => {
                let payload = NameChangedPayload {
                    name: name.to_string(),
                };
                self.name_tx.send_replace(name);
                match MessageToPlayer::with_payload(EventChannel::Player, kinds::NAME_CHANGED, &payload) {
                    Ok(confirmation) => self.deliver(&confirmation).await,
                    Err(e) => tracing::error!(error = %e, "Failed to serialize NAME_CHANGED"),
                }
            }
            Control::RetireIfIdle { idle_for, reply } => {
                let retire = self.connections.is_empty()
                    && self.idle_since.is_some_and(|since| since.elapsed() >= idle_for);
                if retire {
                    cancel.cancel();
                }
                let _ = reply.send(retire);
            }
        }
    }

    /// Write one message to every connection; connections that fail the
    /// write or miss the deadline are removed afterwards.
    async fn deliver(&mut self, message: &MessageToPlayer) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(player_id = %self.session.id(), error = %e, "Failed to serialize message");
                return;
            }
        };

        let deadline = self.write_deadline;
        let writes = self.targets().into_iter().map(|(id, connection)| {
            let text = &text;
            async move {
                let written = tokio::time::timeout(deadline, connection.send_text(text)).await;
                (id, matches!(written, Ok(Ok(()))))
            }
        });
        let failed = failures(join_all(writes).await);

        tracing::debug!(
            player_id = %self.session.id(),
            kind = %message.kind,
            connections = self.connections.len(),
            failed = failed.len(),
            "Delivered message"
        );
        self.drop_failed(failed, "write").await;
    }

    /// Liveness ping to every connection under the write deadline.
    async fn probe(&mut self) {
        let deadline = self.write_deadline;
        let pings = self.targets().into_iter().map(|(id, connection)| async move {
            let pinged = tokio::time::timeout(deadline, connection.send_ping()).await;
            (id, matches!(pinged, Ok(Ok(()))))
        });
        let failed = failures(join_all(pings).await);
        self.drop_failed(failed, "keep-alive").await;
    }

    async fn drop_failed(&mut self, failed: Vec<ConnectionId>, during: &'static str) {
        for connection_id in failed {
            tracing::warn!(player_id = %self.session.id(), %connection_id, during, "Dropping unresponsive connection");
            self.remove(connection_id).await;
        }
    }

    fn targets(&self) -> Vec<(ConnectionId, Arc<dyn Connection>)> {
        self.connections
            .iter()
            .map(|(id, attached)| (*id, attached.connection.clone()))
            .collect()
    }

    async fn release(&mut self) {
        let released: Vec<Attached> = self.connections.drain().map(|(_, attached)| attached).collect();
        for attached in &released {
            attached.reader.cancel();
        }
        let deadline = self.write_deadline;
        join_all(
            released
                .iter()
                .map(|attached| tokio::time::timeout(deadline, attached.connection.close())),
        )
        .await;
        self.idle_since = Some(Instant::now());
    }
}

fn failures(results: Vec<(ConnectionId, bool)>) -> Vec<ConnectionId> {
    results
        .into_iter()
        .filter_map(|(id, ok)| (!ok).then_some(id))
        .collect()
}
