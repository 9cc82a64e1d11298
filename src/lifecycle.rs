//! Game creation, seating, and power assignment (C10).
//!
//! `GameStore` is the process-wide table of games, sharded by game id; the
//! same lock each entry carries is the "per-game lock" referenced
//! throughout the phase/order/scheduler/bot-driver components, so any
//! operation that touches a game's composition or its current phase goes
//! through exactly one mutex per game, never nested.

use std::sync::Arc;

use dashmap::DashMap;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::board::{Power, ALL_POWERS};
use crate::error::ServerError;
use crate::event_hub::{Event, EventHub, EventKind};
use crate::game::{Game, GameStatus, PhaseDurations, PowerAssignmentPolicy, Seat};
use crate::ids::{GameId, IdGenerator, UserId};
use crate::phase_service::PhaseService;

/// Process-wide game table. Each entry's mutex is the single per-game lock
/// shared by the Phase Service, Order Service, Deadline Scheduler, and Bot
/// Driver.
#[derive(Default)]
pub struct GameStore {
    games: DashMap<GameId, Arc<Mutex<Game>>>,
}

impl GameStore {
    pub fn new() -> Self {
        GameStore::default()
    }

    pub(crate) fn insert(&self, game: Game) {
        self.games.insert(game.id, Arc::new(Mutex::new(game)));
    }

    /// Acquires the per-game lock and returns an owned guard over the game.
    pub async fn lock(&self, game_id: GameId) -> Result<OwnedMutexGuard<Game>, ServerError> {
        let handle = self
            .games
            .get(&game_id)
            .map(|entry| entry.clone())
            .ok_or(ServerError::GameNotFound(game_id))?;
        Ok(handle.lock_owned().await)
    }

    /// Snapshots of every game's id, for the Deadline Scheduler and
    /// admin-style listing endpoints.
    pub fn game_ids(&self) -> Vec<GameId> {
        self.games.iter().map(|entry| *entry.key()).collect()
    }
}

/// Game creation, seating, and power assignment.
pub struct GameLifecycle {
    store: Arc<GameStore>,
    hub: Arc<EventHub>,
    ids: IdGenerator,
}

impl GameLifecycle {
    pub fn new(store: Arc<GameStore>, hub: Arc<EventHub>) -> Self {
        GameLifecycle { store, hub, ids: IdGenerator::new() }
    }

    pub fn create(
        &self,
        name: String,
        creator: UserId,
        phase_durations: PhaseDurations,
        power_assignment: PowerAssignmentPolicy,
    ) -> GameId {
        let id = self.ids.next_game_id();
        let mut game = Game::new(id, name, creator.clone(), phase_durations, power_assignment);
        game.seats.push(Seat::human(creator));
        self.store.insert(game);
        id
    }

    pub async fn join(&self, game_id: GameId, user: UserId) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        if game.status != GameStatus::Waiting {
            return Err(ServerError::Internal("game is not accepting players".into()));
        }
        if game.seats.iter().any(|s| s.user == user) {
            return Ok(());
        }
        if game.seats.len() >= 7 {
            return Err(ServerError::Internal("game is full".into()));
        }
        game.seats.push(Seat::human(user));
        self.broadcast_power_changed(&game).await;
        Ok(())
    }

    pub async fn join_as_bot(
        &self,
        game_id: GameId,
        bot_user: UserId,
        difficulty: crate::game::BotDifficulty,
    ) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        if game.status != GameStatus::Waiting || game.seats.len() >= 7 {
            return Err(ServerError::Internal("game is not accepting players".into()));
        }
        game.seats.push(Seat::bot(bot_user, difficulty));
        self.broadcast_power_changed(&game).await;
        Ok(())
    }

    /// Atomically swaps a seat's occupant while preserving its assigned
    /// power, for replacing a disconnected human with a bot or vice versa.
    pub async fn replace_bot(
        &self,
        game_id: GameId,
        power: Power,
        new_occupant: UserId,
        is_bot: bool,
        difficulty: Option<crate::game::BotDifficulty>,
    ) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        let seat = game
            .seats
            .iter_mut()
            .find(|s| s.power == Some(power))
            .ok_or(ServerError::NotInGame { game: game_id, power: Some(power) })?;
        seat.user = new_occupant;
        seat.is_bot = is_bot;
        seat.bot_difficulty = difficulty;
        self.broadcast_power_changed(&game).await;
        Ok(())
    }

    pub async fn assign_powers(&self, game_id: GameId, policy: PowerAssignmentPolicy) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        match policy {
            PowerAssignmentPolicy::Random => {
                let mut powers = ALL_POWERS.to_vec();
                let mut rng = SmallRng::from_entropy();
                powers.shuffle(&mut rng);
                for (seat, power) in game.seats.iter_mut().zip(powers) {
                    seat.power = Some(power);
                }
            }
            PowerAssignmentPolicy::Manual => {
                // Manual assignment is driven seat-by-seat through
                // `assign_power`; nothing to do in bulk here.
            }
        }
        self.broadcast_power_changed(&game).await;
        Ok(())
    }

    pub async fn assign_power(&self, game_id: GameId, user: &UserId, power: Power) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        if game.seats.iter().any(|s| s.power == Some(power) && &s.user != user) {
            return Err(ServerError::InvalidOrder(format!("{power:?} already assigned")));
        }
        let seat = game
            .seats
            .iter_mut()
            .find(|s| &s.user == user)
            .ok_or(ServerError::NotInGame { game: game_id, power: None })?;
        seat.power = Some(power);
        self.broadcast_power_changed(&game).await;
        Ok(())
    }

    /// Validates seven assigned seats, then delegates to the Phase
    /// Service to mint the opening phase.
    pub async fn start(&self, game_id: GameId, phase_service: &PhaseService) -> Result<(), ServerError> {
        {
            let game = self.store.lock(game_id).await?;
            if !game.is_ready_to_start() {
                return Err(ServerError::Internal("game does not have seven assigned seats".into()));
            }
        }
        phase_service.start(game_id).await?;
        let game = self.store.lock(game_id).await?;
        self.hub
            .broadcast_to_game(Event::new(EventKind::GameStarted, game_id, serde_json::Value::Null))
            .await;
        drop(game);
        Ok(())
    }

    pub async fn set_finished(&self, game_id: GameId, winner: Option<Power>) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        game.status = GameStatus::Finished;
        game.winner = winner;
        self.hub
            .broadcast_to_game(Event::new(
                EventKind::GameEnded,
                game_id,
                serde_json::json!({ "winner": winner.map(|p| format!("{p:?}")) }),
            ))
            .await;
        Ok(())
    }

    /// Deletes a game; only legal while it is still in the waiting state.
    pub async fn delete(&self, game_id: GameId) -> Result<(), ServerError> {
        {
            let game = self.store.lock(game_id).await?;
            if game.status != GameStatus::Waiting {
                return Err(ServerError::Internal("cannot delete a started game".into()));
            }
        }
        self.store.games.remove(&game_id);
        Ok(())
    }

    async fn broadcast_power_changed(&self, game: &Game) {
        self.hub
            .broadcast_to_game(Event::new(EventKind::PowerChanged, game.id, serde_json::Value::Null))
            .await;
    }
}
