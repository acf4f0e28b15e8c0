//! Idle eviction.
//!
//! Sessions outlive their connections so a player can reconnect. A reaper
//! sweeps the lobby every `reap_interval` and retires sessions that have
//! had no connection for `idle_eviction`. The idle check runs on each
//! session's own loop, so it cannot race an attach.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use super::Hub;
use crate::session::PlayerSession;

impl Hub {
    /// Start the idle reaper. Does nothing when eviction is disabled.
    pub fn spawn_reaper(&self) {
        let Some(idle_for) = self.config.idle_eviction else {
            tracing::debug!("Idle eviction disabled");
            return;
        };
        let every = self.config.reap_interval;
        let hub = self.me.clone();
        let cancel = self.cancel.clone();

        self.tracker.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(hub) = hub.upgrade() else { break };
                let evicted = hub.reap_idle(idle_for).await;
                if evicted > 0 {
                    let lobby = hub.lobby_size().await;
                    tracing::debug!(evicted, lobby, "Evicted idle sessions");
                }
            }
            tracing::debug!("Idle reaper stopped");
        });
    }

    /// Retire and remove every session idle for at least `idle_for`, plus
    /// any whose loop has already exited. Returns how many were removed.
    pub async fn reap_idle(&self, idle_for: Duration) -> usize {
        let sessions: Vec<PlayerSession> = self.sessions.read().await.values().cloned().collect();

        let mut retired = Vec::new();
        for session in sessions {
            if session.is_stopped() {
                retired.push(session);
                continue;
            }
            match session.retire_if_idle(idle_for).await {
                Ok(true) => retired.push(session),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(player_id = %session.id(), error = %e, "Idle check failed")
                }
            }
        }

        if retired.is_empty() {
            return 0;
        }
        let mut lobby = self.sessions.write().await;
        let before = lobby.len();
        for session in &retired {
            if lobby.get(&session.id()).is_some_and(|s| s.ptr_eq(session)) {
                lobby.remove(&session.id());
            }
        }
        before - lobby.len()
    }
}
