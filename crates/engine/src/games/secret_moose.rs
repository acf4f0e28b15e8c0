//! Secret Moose behind the `Game` port.
//!
//! The rule aggregate lives in the domain crate; this adapter adds seat
//! handles, the readiness signal that drives `auto_start`, and the role
//! announcements sent when the game starts.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use gamehub_domain::{
    Faction, GameError, GameId, GameName, GameStatus, PlayerId, SeatView, SecretMoose,
};
use gamehub_shared::{
    kinds, EventChannel, GameStartedPayload, MessageFromPlayer, MessageToPlayer,
    RoleAssignedPayload,
};
use rand::seq::SliceRandom;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::Game;
use crate::session::PlayerSession;

/// Returns a permutation of `0..n`.
type Shuffle = Box<dyn Fn(usize) -> Vec<usize> + Send + Sync>;

struct Table {
    rules: SecretMoose,
    seats: HashMap<PlayerId, PlayerSession>,
}

impl Table {
    fn name_of(&self, player: PlayerId) -> String {
        self.seats
            .get(&player)
            .map(|seat| seat.display_name().to_string())
            .unwrap_or_default()
    }

    fn seat_view(&self, player: PlayerId) -> SeatView {
        SeatView {
            id: player,
            name: self.name_of(player),
        }
    }
}

pub struct SecretMooseGame {
    id: OnceLock<GameId>,
    table: Mutex<Table>,
    ready: Notify,
    ended: CancellationToken,
    shuffle: Shuffle,
}

fn random_order(n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut rand::thread_rng());
    order
}

impl SecretMooseGame {
    pub fn new(name: GameName) -> Self {
        Self::with_shuffle(name, random_order)
    }

    /// Build a game dealt by `shuffle` instead of the thread RNG.
    pub fn with_shuffle(
        name: GameName,
        shuffle: impl Fn(usize) -> Vec<usize> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: OnceLock::new(),
            table: Mutex::new(Table {
                rules: SecretMoose::new(name, Utc::now()),
                seats: HashMap::new(),
            }),
            ready: Notify::new(),
            ended: CancellationToken::new(),
            shuffle: Box::new(shuffle),
        }
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn game_id(&self) -> GameId {
        self.id.get().copied().unwrap_or_default()
    }

    /// Private role for every seat plus the public start notice.
    fn announcements(
        &self,
        table: &Table,
    ) -> Result<Vec<(PlayerSession, Vec<MessageToPlayer>)>, serde_json::Error> {
        let game_id = self.game_id();
        let rules = &table.rules;
        let fascists: Vec<SeatView> = rules
            .fascists()
            .iter()
            .map(|p| table.seat_view(*p))
            .collect();
        let started = MessageToPlayer::with_payload(
            EventChannel::Game,
            kinds::GAME_STARTED,
            &GameStartedPayload {
                game_id,
                first_president: rules.first_president().map(|p| table.seat_view(p)),
                players: rules.seats().iter().map(|s| table.seat_view(s.player())).collect(),
            },
        )?;

        let mut deliveries = Vec::with_capacity(rules.seats().len());
        for seat in rules.seats() {
            let player = seat.player();
            let (Some(session), Some(faction)) = (table.seats.get(&player), rules.faction_of(player))
            else {
                continue;
            };
            let role = MessageToPlayer::with_payload(
                EventChannel::Private,
                kinds::ROLE_ASSIGNED,
                &RoleAssignedPayload {
                    game_id,
                    faction,
                    moose: rules.moose() == Some(player),
                    fascists: (faction == Faction::Fascist).then(|| fascists.clone()),
                },
            )?;
            deliveries.push((session.clone(), vec![role, started.clone()]));
        }
        Ok(deliveries)
    }
}

#[async_trait]
impl Game for SecretMooseGame {
    fn registered(&self, id: GameId) {
        if self.id.set(id).is_err() {
            tracing::warn!(game_id = %id, "Game was already registered");
        }
    }

    async fn add_player(&self, player: PlayerSession) -> Result<(), GameError> {
        let mut table = self.table();
        // A returning player whose old session was retired takes the seat back.
        if let Some(seat) = table.seats.get_mut(&player.id()) {
            if seat.is_stopped() && !player.is_stopped() {
                *seat = player;
                tracing::debug!(game_id = %self.game_id(), player_id = %seat.id(), "Player reseated");
                return Ok(());
            }
        }
        table.rules.add_player(player.id())?;
        tracing::debug!(game_id = %self.game_id(), player_id = %player.id(), "Player seated");
        table.seats.insert(player.id(), player);
        Ok(())
    }

    fn rebind(&self, player: &PlayerSession) -> bool {
        let mut table = self.table();
        let Some(seat) = table.seats.get_mut(&player.id()) else {
            return false;
        };
        if !seat.ptr_eq(player) {
            *seat = player.clone();
            tracing::debug!(game_id = %self.game_id(), player_id = %player.id(), "Seat rebound");
        }
        true
    }

    async fn remove_player(&self, player: PlayerId) -> Result<(), GameError> {
        let mut table = self.table();
        table.rules.remove_player(player)?;
        table.seats.remove(&player);
        tracing::debug!(game_id = %self.game_id(), player_id = %player, "Player left");
        Ok(())
    }

    async fn player_event(
        &self,
        player: PlayerSession,
        event: MessageFromPlayer,
    ) -> Result<(), GameError> {
        let mut table = self.table();
        if !table.rules.is_seated(player.id()) {
            return Err(GameError::UnknownPlayer);
        }
        match event.kind.as_str() {
            kinds::TOGGLE_READY | "TOGGLE_READY" => {
                let ready = table.rules.toggle_ready(player.id())?;
                drop(table);
                tracing::debug!(game_id = %self.game_id(), player_id = %player.id(), ready, "Readiness toggled");
                self.ready.notify_one();
                Ok(())
            }
            other => Err(GameError::UnknownEvent(other.to_string())),
        }
    }

    fn name(&self) -> String {
        self.table().rules.name().to_string()
    }

    fn status(&self) -> GameStatus {
        self.table().rules.status()
    }

    async fn start_game(&self) -> Result<(), GameError> {
        let deliveries = {
            let mut table = self.table();
            table.rules.start(|n| (self.shuffle)(n))?;
            self.announcements(&table)
        };
        tracing::info!(game_id = %self.game_id(), "Game started");

        match deliveries {
            Ok(deliveries) => {
                for (seat, messages) in deliveries {
                    if let Err(e) = seat.send(messages).await {
                        tracing::warn!(
                            game_id = %self.game_id(),
                            player_id = %seat.id(),
                            error = %e,
                            "Could not deliver role"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::error!(game_id = %self.game_id(), error = %e, "Failed to serialize role announcements")
            }
        }
        Ok(())
    }

    async fn end_game(&self) {
        let ended = self.table().rules.end();
        self.ended.cancel();
        if ended {
            tracing::info!(game_id = %self.game_id(), "Game ended");
        }
    }

    async fn auto_start(&self) {
        loop {
            if self.status() != GameStatus::Created {
                return;
            }
            tokio::select! {
                _ = self.ended.cancelled() => return,
                _ = self.ready.notified() => {}
            }
            match self.start_game().await {
                Ok(()) => return,
                Err(e) => {
                    tracing::debug!(game_id = %self.game_id(), reason = %e, "Auto start not possible yet")
                }
            }
        }
    }

    fn public_view(&self) -> Result<serde_json::Value, serde_json::Error> {
        let table = self.table();
        serde_json::to_value(table.rules.view(|p| table.name_of(p)))
    }
}
