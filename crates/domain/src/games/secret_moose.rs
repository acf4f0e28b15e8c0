//! Secret Moose - the reference game served by the lobby.
//!
//! Players gather in a `Created` game, toggle readiness, and once everyone is
//! ready the seats are split into two concealed factions. The smaller
//! (fascist) faction is sized from a fixed table keyed on player count and one
//! of its members is the Moose. A second shuffle picks the first president.
//!
//! Randomness is injected: `start` takes a closure that returns a permutation
//! of `0..n`, so tests can pin the outcome.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::GameError;
use crate::games::{is_permutation, GameStatus};
use crate::ids::PlayerId;
use crate::value_objects::GameName;

/// Fewest seats a game can start with.
pub const MIN_PLAYERS: usize = 5;

/// Most seats a game can hold.
pub const MAX_PLAYERS: usize = 10;

/// Size of the fascist faction for a given player count.
pub fn fascist_count(players: usize) -> Option<usize> {
    match players {
        5 | 6 => Some(2),
        7 | 8 => Some(3),
        9 | 10 => Some(4),
        _ => None,
    }
}

/// The two concealed factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Fascist,
    Liberal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    player: PlayerId,
    ready: bool,
}

impl Seat {
    pub fn player(&self) -> PlayerId {
        self.player
    }
}

/// State of one Secret Moose game.
///
/// # Invariants
///
/// - At most `MAX_PLAYERS` seats, each player seated once
/// - Seats only change while `Created`
/// - Factions, Moose and first president are set together by `start`
#[derive(Debug, Clone)]
pub struct SecretMoose {
    name: GameName,
    status: GameStatus,
    created_at: DateTime<Utc>,
    seats: Vec<Seat>,
    fascists: Vec<PlayerId>,
    liberals: Vec<PlayerId>,
    moose: Option<PlayerId>,
    first_president: Option<PlayerId>,
}

impl SecretMoose {
    pub fn new(name: GameName, now: DateTime<Utc>) -> Self {
        Self {
            name,
            status: GameStatus::Created,
            created_at: now,
            seats: Vec::new(),
            fascists: Vec::new(),
            liberals: Vec::new(),
            moose: None,
            first_president: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &GameName {
        &self.name
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn is_seated(&self, player: PlayerId) -> bool {
        self.seats.iter().any(|s| s.player == player)
    }

    pub fn all_ready(&self) -> bool {
        self.seats.iter().all(|s| s.ready)
    }

    pub fn fascists(&self) -> &[PlayerId] {
        &self.fascists
    }

    pub fn liberals(&self) -> &[PlayerId] {
        &self.liberals
    }

    pub fn moose(&self) -> Option<PlayerId> {
        self.moose
    }

    pub fn first_president(&self) -> Option<PlayerId> {
        self.first_president
    }

    pub fn faction_of(&self, player: PlayerId) -> Option<Faction> {
        if self.fascists.contains(&player) {
            Some(Faction::Fascist)
        } else if self.liberals.contains(&player) {
            Some(Faction::Liberal)
        } else {
            None
        }
    }

    // =========================================================================
    // Lobby phase
    // =========================================================================

    /// Seat a player. Capacity is checked before the game status.
    pub fn add_player(&mut self, player: PlayerId) -> Result<(), GameError> {
        if self.seats.len() >= MAX_PLAYERS {
            return Err(GameError::GameFull);
        }
        if self.status != GameStatus::Created {
            return Err(GameError::AlreadyStarted);
        }
        if self.is_seated(player) {
            return Err(GameError::AlreadyJoined);
        }
        self.seats.push(Seat {
            player,
            ready: false,
        });
        Ok(())
    }

    pub fn remove_player(&mut self, player: PlayerId) -> Result<(), GameError> {
        if self.status != GameStatus::Created {
            return Err(GameError::AlreadyStarted);
        }
        let index = self
            .seats
            .iter()
            .position(|s| s.player == player)
            .ok_or(GameError::UnknownPlayer)?;
        self.seats.remove(index);
        Ok(())
    }

    /// Flip a seated player's readiness and return the new value.
    pub fn toggle_ready(&mut self, player: PlayerId) -> Result<bool, GameError> {
        if self.status != GameStatus::Created {
            return Err(GameError::AlreadyStarted);
        }
        let seat = self
            .seats
            .iter_mut()
            .find(|s| s.player == player)
            .ok_or(GameError::UnknownPlayer)?;
        seat.ready = !seat.ready;
        Ok(seat.ready)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Start the game.
    ///
    /// `shuffle(n)` must return a permutation of `0..n`; it is called twice,
    /// once to deal factions and once to pick the first president.
    pub fn start(&mut self, mut shuffle: impl FnMut(usize) -> Vec<usize>) -> Result<(), GameError> {
        if self.status != GameStatus::Created {
            return Err(GameError::AlreadyStarted);
        }
        let count = self.seats.len();
        if count < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers {
                required: MIN_PLAYERS,
                actual: count,
            });
        }
        let total_fascists = fascist_count(count).ok_or(GameError::TooManyPlayers {
            max: MAX_PLAYERS,
            actual: count,
        })?;
        if !self.all_ready() {
            return Err(GameError::PlayersNotReady);
        }

        let dealt = reorder(&self.seats, &shuffle(count))?;
        let presidency = reorder(&dealt, &shuffle(count))?;

        self.fascists = dealt[..total_fascists].iter().map(Seat::player).collect();
        self.liberals = dealt[total_fascists..].iter().map(Seat::player).collect();
        self.moose = self.fascists.first().copied();
        self.first_president = presidency.first().map(Seat::player);
        self.seats = presidency;
        self.status = GameStatus::Started;
        Ok(())
    }

    /// Move to `Finished`. Returns `false` if the game had already ended.
    pub fn end(&mut self) -> bool {
        if self.status.is_finished() {
            return false;
        }
        self.status = GameStatus::Finished;
        true
    }

    // =========================================================================
    // Projection
    // =========================================================================

    /// Public view of the game. Factions stay hidden until `Finished`.
    pub fn view(&self, name_of: impl Fn(PlayerId) -> String) -> MooseView {
        let seat_view = |player: PlayerId| SeatView {
            id: player,
            name: name_of(player),
        };
        let revealed = self.status.is_finished() && self.moose.is_some();

        MooseView {
            name: self.name.to_string(),
            status: self.status,
            created: self.created_at,
            players: self.seats.iter().map(|s| seat_view(s.player)).collect(),
            fascists: revealed.then(|| self.fascists.iter().copied().map(seat_view).collect()),
            liberals: revealed.then(|| self.liberals.iter().copied().map(seat_view).collect()),
            moose: self.moose.filter(|_| revealed).map(seat_view),
            first_president: self.first_president.filter(|_| revealed).map(seat_view),
        }
    }
}

fn reorder(seats: &[Seat], order: &[usize]) -> Result<Vec<Seat>, GameError> {
    if !is_permutation(order, seats.len()) {
        return Err(GameError::InvalidShuffle);
    }
    Ok(order.iter().map(|&i| seats[i].clone()).collect())
}

/// Serialized projection of a player inside a game.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatView {
    pub id: PlayerId,
    pub name: String,
}

/// Serialized projection of a game for the lobby roster.
#[derive(Debug, Clone, Serialize)]
pub struct MooseView {
    pub name: String,
    pub status: GameStatus,
    pub created: DateTime<Utc>,
    pub players: Vec<SeatView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fascists: Option<Vec<SeatView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liberals: Option<Vec<SeatView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moose: Option<SeatView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_president: Option<SeatView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    fn game_with(players: usize, ready: bool) -> (SecretMoose, Vec<PlayerId>) {
        let mut game = SecretMoose::new(GameName::or_default("Lunchtime Brawl"), Utc::now());
        let ids: Vec<PlayerId> = (0..players).map(|_| PlayerId::new()).collect();
        for id in &ids {
            game.add_player(*id).unwrap();
            if ready {
                game.toggle_ready(*id).unwrap();
            }
        }
        (game, ids)
    }

    #[test]
    fn new_game_is_created_and_empty() {
        let game = SecretMoose::new(GameName::default(), Utc::now());
        assert_eq!(game.status(), GameStatus::Created);
        assert_eq!(game.name().as_str(), "Untitled");
        assert!(game.seats().is_empty());
    }

    #[test]
    fn eleventh_player_is_rejected() {
        let (mut game, _) = game_with(10, false);
        let err = game.add_player(PlayerId::new()).unwrap_err();
        assert_eq!(err, GameError::GameFull);
        assert_eq!(game.seats().len(), 10);
    }

    #[test]
    fn cannot_join_twice() {
        let (mut game, ids) = game_with(1, false);
        assert_eq!(game.add_player(ids[0]), Err(GameError::AlreadyJoined));
    }

    #[test]
    fn cannot_join_after_start() {
        let (mut game, _) = game_with(5, true);
        game.start(identity).unwrap();
        assert_eq!(
            game.add_player(PlayerId::new()),
            Err(GameError::AlreadyStarted)
        );
    }

    #[test]
    fn remove_player_frees_the_seat() {
        let (mut game, ids) = game_with(3, false);
        game.remove_player(ids[1]).unwrap();
        assert_eq!(game.seats().len(), 2);
        assert!(!game.is_seated(ids[1]));
    }

    #[test]
    fn remove_unknown_player_fails() {
        let (mut game, _) = game_with(3, false);
        assert_eq!(
            game.remove_player(PlayerId::new()),
            Err(GameError::UnknownPlayer)
        );
    }

    #[test]
    fn remove_after_start_fails() {
        let (mut game, ids) = game_with(5, true);
        game.start(identity).unwrap();
        assert_eq!(game.remove_player(ids[0]), Err(GameError::AlreadyStarted));
    }

    #[test]
    fn toggle_ready_flips() {
        let (mut game, ids) = game_with(1, false);
        assert_eq!(game.toggle_ready(ids[0]), Ok(true));
        assert_eq!(game.toggle_ready(ids[0]), Ok(false));
        assert_eq!(
            game.toggle_ready(PlayerId::new()),
            Err(GameError::UnknownPlayer)
        );
    }

    #[test]
    fn start_needs_five_players() {
        let (mut game, _) = game_with(4, true);
        assert_eq!(
            game.start(identity),
            Err(GameError::NotEnoughPlayers {
                required: 5,
                actual: 4
            })
        );
        assert_eq!(game.status(), GameStatus::Created);
    }

    #[test]
    fn start_needs_everyone_ready() {
        let (mut game, ids) = game_with(5, true);
        game.toggle_ready(ids[2]).unwrap();
        assert_eq!(game.start(identity), Err(GameError::PlayersNotReady));
    }

    #[test]
    fn start_rejects_a_bad_shuffle() {
        let (mut game, _) = game_with(5, true);
        assert_eq!(game.start(|_| vec![0, 0, 1, 2, 3]), Err(GameError::InvalidShuffle));
        assert_eq!(game.status(), GameStatus::Created);
    }

    #[test]
    fn five_players_split_two_and_three() {
        let (mut game, ids) = game_with(5, true);
        game.start(identity).unwrap();

        assert_eq!(game.status(), GameStatus::Started);
        assert_eq!(game.fascists().len(), 2);
        assert_eq!(game.liberals().len(), 3);
        assert_eq!(game.fascists(), &ids[..2]);
        assert_eq!(game.moose(), Some(ids[0]));
        assert_eq!(game.first_president(), Some(ids[0]));
        assert_eq!(game.faction_of(ids[4]), Some(Faction::Liberal));
    }

    #[test]
    fn faction_table_matches_player_count() {
        for (players, expected) in [(5, 2), (6, 2), (7, 3), (8, 3), (9, 4), (10, 4)] {
            let (mut game, _) = game_with(players, true);
            game.start(identity).unwrap();
            assert_eq!(game.fascists().len(), expected, "{players} players");
            assert_eq!(game.liberals().len(), players - expected);
        }
        assert_eq!(fascist_count(4), None);
        assert_eq!(fascist_count(11), None);
    }

    #[test]
    fn shuffles_decide_moose_and_president() {
        let (mut game, ids) = game_with(5, true);
        let mut calls = 0;
        game.start(|n| {
            calls += 1;
            let mut order: Vec<usize> = (0..n).collect();
            order.reverse();
            order
        })
        .unwrap();

        assert_eq!(calls, 2);
        // First shuffle reverses, so the last seat becomes the Moose.
        assert_eq!(game.moose(), Some(ids[4]));
        assert_eq!(game.fascists(), &[ids[4], ids[3]]);
        // Second shuffle reverses back.
        assert_eq!(game.first_president(), Some(ids[0]));
    }

    #[test]
    fn end_is_idempotent() {
        let (mut game, _) = game_with(2, false);
        assert!(game.end());
        assert!(!game.end());
        assert_eq!(game.status(), GameStatus::Finished);
    }

    #[test]
    fn view_hides_factions_until_finished() {
        let (mut game, _) = game_with(5, true);
        game.start(identity).unwrap();

        let started = serde_json::to_value(game.view(|_| "P".to_string())).unwrap();
        assert_eq!(started["name"], "Lunchtime Brawl");
        assert_eq!(started["status"], "Started");
        assert!(started.get("fascists").is_none());
        assert!(started.get("moose").is_none());

        game.end();
        let finished = serde_json::to_value(game.view(|_| "P".to_string())).unwrap();
        assert_eq!(finished["fascists"].as_array().unwrap().len(), 2);
        assert_eq!(finished["liberals"].as_array().unwrap().len(), 3);
        assert!(finished.get("moose").is_some());
        assert!(finished.get("first_president").is_some());
    }

    #[test]
    fn view_of_unstarted_finished_game_reveals_nothing() {
        let (mut game, _) = game_with(2, false);
        game.end();
        let view = serde_json::to_value(game.view(|_| "P".to_string())).unwrap();
        assert_eq!(view["status"], "Finished");
        assert!(view.get("fascists").is_none());
    }
}
