//! Durable storage contract for games, phases, and orders.
//!
//! `PhaseRepository` is the abstract collaborator the Phase Service writes
//! through; the HTTP/JSON encoding and the actual SQL schema live outside
//! this crate. `InMemoryRepository` is the reference implementation used by
//! tests and, if no external store is configured, by the server binary.

use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::board::{BoardState, Order, Power};
use crate::error::RepositoryError;
use crate::game::GamePhase;
use crate::ids::{GameId, IdGenerator, PhaseId};

/// Durable storage operations the Phase Service needs. Object-safe so a
/// server binary can hold it behind a single `Arc<dyn PhaseRepository>`.
#[async_trait]
pub trait PhaseRepository: Send + Sync {
    /// Creates a new unresolved phase for `game_id` and returns its id.
    async fn create_phase(
        &self,
        game_id: GameId,
        state_before: BoardState,
        deadline: Instant,
    ) -> Result<PhaseId, RepositoryError>;

    /// The current unresolved phase for a game, if one exists.
    async fn fetch_current_phase(&self, game_id: GameId) -> Result<GamePhase, RepositoryError>;

    /// All phases for a game, ordered by creation (ascending phase id).
    async fn fetch_phases(&self, game_id: GameId) -> Result<Vec<GamePhase>, RepositoryError>;

    /// Replaces `power`'s submitted orders on the game's current phase.
    async fn append_orders(
        &self,
        game_id: GameId,
        power: Power,
        orders: Vec<Order>,
    ) -> Result<(), RepositoryError>;

    /// Replaces `power`'s ready flag on the game's current phase.
    async fn set_ready(&self, game_id: GameId, power: Power, ready: bool) -> Result<(), RepositoryError>;

    /// Marks the game's current phase resolved, atomically: once this
    /// returns `Ok`, no other caller observes the phase as unresolved.
    async fn mark_resolved(
        &self,
        game_id: GameId,
        state_after: BoardState,
        orders_with_results: Vec<(Order, Power)>,
    ) -> Result<(), RepositoryError>;

    /// Current-unresolved phases across all games whose deadline has
    /// already elapsed, for the Deadline Scheduler to drive.
    async fn list_expired_phases(&self, now: Instant) -> Result<Vec<GameId>, RepositoryError>;
}

/// Sharded in-memory `PhaseRepository`. Each game's phase history lives
/// behind its own `DashMap` entry so unrelated games never contend.
pub struct InMemoryRepository {
    phases: DashMap<GameId, Vec<GamePhase>>,
    ids: IdGenerator,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        InMemoryRepository {
            phases: DashMap::new(),
            ids: IdGenerator::new(),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhaseRepository for InMemoryRepository {
    async fn create_phase(
        &self,
        game_id: GameId,
        state_before: BoardState,
        deadline: Instant,
    ) -> Result<PhaseId, RepositoryError> {
        let id = self.ids.next_phase_id();
        let phase = GamePhase::new(id, game_id, state_before, deadline);
        self.phases.entry(game_id).or_default().push(phase);
        Ok(id)
    }

    async fn fetch_current_phase(&self, game_id: GameId) -> Result<GamePhase, RepositoryError> {
        let history = self
            .phases
            .get(&game_id)
            .ok_or(RepositoryError::GameNotFound(game_id))?;
        history
            .iter()
            .rev()
            .find(|p| !p.is_resolved())
            .cloned()
            .ok_or(RepositoryError::NoCurrentPhase(game_id))
    }

    async fn fetch_phases(&self, game_id: GameId) -> Result<Vec<GamePhase>, RepositoryError> {
        self.phases
            .get(&game_id)
            .map(|history| history.clone())
            .ok_or(RepositoryError::GameNotFound(game_id))
    }

    async fn append_orders(
        &self,
        game_id: GameId,
        power: Power,
        orders: Vec<Order>,
    ) -> Result<(), RepositoryError> {
        let mut history = self
            .phases
            .get_mut(&game_id)
            .ok_or(RepositoryError::GameNotFound(game_id))?;
        let phase = history
            .iter_mut()
            .rev()
            .find(|p| !p.is_resolved())
            .ok_or(RepositoryError::NoCurrentPhase(game_id))?;
        phase.set_orders(power, orders);
        Ok(())
    }

    async fn set_ready(&self, game_id: GameId, power: Power, ready: bool) -> Result<(), RepositoryError> {
        let mut history = self
            .phases
            .get_mut(&game_id)
            .ok_or(RepositoryError::GameNotFound(game_id))?;
        let phase = history
            .iter_mut()
            .rev()
            .find(|p| !p.is_resolved())
            .ok_or(RepositoryError::NoCurrentPhase(game_id))?;
        phase.set_ready(power, ready);
        Ok(())
    }

    async fn mark_resolved(
        &self,
        game_id: GameId,
        state_after: BoardState,
        orders_with_results: Vec<(Order, Power)>,
    ) -> Result<(), RepositoryError> {
        let mut history = self
            .phases
            .get_mut(&game_id)
            .ok_or(RepositoryError::GameNotFound(game_id))?;
        let phase = history
            .iter_mut()
            .rev()
            .find(|p| !p.is_resolved())
            .ok_or(RepositoryError::NoCurrentPhase(game_id))?;
        // Record each submitted order back onto its power's slot so the
        // persisted phase reflects exactly what was adjudicated, including
        // orders defaulted to hold.
        phase.orders.clear();
        for (order, power) in orders_with_results {
            phase.orders.entry(power).or_default().push(order);
        }
        phase.state_after = Some(state_after);
        phase.resolved_at = Some(Instant::now());
        Ok(())
    }

    async fn list_expired_phases(&self, now: Instant) -> Result<Vec<GameId>, RepositoryError> {
        let expired = self
            .phases
            .iter()
            .filter_map(|entry| {
                let game_id = *entry.key();
                entry
                    .value()
                    .iter()
                    .rev()
                    .find(|p| !p.is_resolved())
                    .filter(|p| p.is_expired(now))
                    .map(|_| game_id)
            })
            .collect();
        Ok(expired)
    }
}
