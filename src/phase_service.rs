//! Phase state machine for a single game (C5).
//!
//! Owns Start/Submit/MarkReady/UnmarkReady/Resolve/DeadlineTick/VoteDraw.
//! Resolve is the critical section described in the concurrency model: it
//! re-reads the current phase before doing anything, so a racing deadline
//! tick and an early-resolution trigger both converge on a single
//! adjudication and the loser simply no-ops.

use std::time::Instant;

use crate::board::{BoardState, Location, Order, OrderUnit, Phase as PhaseKind, Power, ALL_POWERS};
use crate::error::ServerError;
use crate::event_hub::{Event, EventHub, EventKind};
use crate::game::GameStatus;
use crate::ids::GameId;
use crate::lifecycle::GameStore;
use crate::repository::PhaseRepository;
use crate::resolve::{adjudicate, is_game_over, AdjudicationOutcome};
use crate::scheduler::SchedulerHandle;
use std::sync::{Arc, RwLock};

pub struct PhaseService {
    store: Arc<GameStore>,
    repository: Arc<dyn PhaseRepository>,
    hub: Arc<EventHub>,
    scheduler: RwLock<Option<SchedulerHandle>>,
}

impl PhaseService {
    pub fn new(store: Arc<GameStore>, repository: Arc<dyn PhaseRepository>, hub: Arc<EventHub>) -> Self {
        PhaseService { store, repository, hub, scheduler: RwLock::new(None) }
    }

    /// Wires in the Deadline Scheduler so newly created phases are pushed
    /// into its wakeup heap immediately instead of waiting for its idle
    /// poll. Constructed after `PhaseService` itself, since the scheduler
    /// needs an `Arc<PhaseService>` to drive ticks against.
    pub fn attach_scheduler(&self, handle: SchedulerHandle) {
        *self.scheduler.write().unwrap() = Some(handle);
    }

    fn notify_scheduler(&self, deadline: Instant) {
        if let Some(handle) = self.scheduler.read().unwrap().as_ref() {
            handle.notify(deadline);
        }
    }

    /// Mints the Spring 1901 movement phase and activates the game.
    pub async fn start(&self, game_id: GameId) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        let state = BoardState::starting_position();
        let deadline = Instant::now() + game.phase_durations.for_kind(PhaseKind::Movement);
        self.repository.create_phase(game_id, state, deadline).await?;
        game.status = GameStatus::Active;
        self.notify_scheduler(deadline);
        self.broadcast(game_id, EventKind::PhaseChanged).await;
        drop(game);
        Ok(())
    }

    /// Persists `power`'s orders for the current phase.
    pub async fn submit(&self, game_id: GameId, power: Power, orders: Vec<Order>) -> Result<(), ServerError> {
        {
            let _guard = self.store.lock(game_id).await?;
            self.repository.append_orders(game_id, power, orders).await?;
        }
        self.broadcast(game_id, EventKind::PlayerReady).await;
        Ok(())
    }

    pub async fn mark_ready(&self, game_id: GameId, power: Power) -> Result<(), ServerError> {
        self.set_ready(game_id, power, true).await
    }

    pub async fn unmark_ready(&self, game_id: GameId, power: Power) -> Result<(), ServerError> {
        self.set_ready(game_id, power, false).await
    }

    async fn set_ready(&self, game_id: GameId, power: Power, ready: bool) -> Result<(), ServerError> {
        {
            let _guard = self.store.lock(game_id).await?;
            self.repository.set_ready(game_id, power, ready).await?;
        }
        if ready && self.all_seated_powers_ready(game_id).await? {
            self.resolve(game_id).await?;
        }
        Ok(())
    }

    async fn all_seated_powers_ready(&self, game_id: GameId) -> Result<bool, ServerError> {
        let game = self.store.lock(game_id).await?;
        let phase = self.repository.fetch_current_phase(game_id).await?;
        for seat in &game.seats {
            let Some(power) = seat.power else { continue };
            if power_has_pending_action(&phase, power) && !phase.is_ready(power) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Re-reads the current phase, adjudicates it if still unresolved,
    /// persists the outcome, and either mints the next phase or ends the
    /// game. A phase already resolved by a racing caller is a silent no-op.
    pub async fn resolve(&self, game_id: GameId) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        if game.status != GameStatus::Active {
            return Ok(());
        }

        let phase = match self.repository.fetch_current_phase(game_id).await {
            Ok(phase) => phase,
            Err(_) => return Ok(()),
        };
        if phase.is_resolved() {
            return Ok(());
        }

        let mut state = phase.state_before.clone();
        let orders = default_missing_holds(phase.orders_for_adjudication(), &state);
        let outcome = adjudicate(&mut state, &orders);

        self.repository
            .mark_resolved(game_id, state.clone(), orders_from_outcome(&outcome))
            .await?;
        self.broadcast(game_id, EventKind::PhaseResolved).await;

        if state.season == crate::board::Season::Fall
            && phase.phase_kind == PhaseKind::Movement
        {
            if let Some(winner) = is_game_over(&state) {
                game.status = GameStatus::Finished;
                game.winner = Some(winner);
                drop(game);
                self.broadcast(game_id, EventKind::GameEnded).await;
                return Ok(());
            }
        }

        let deadline = Instant::now() + game.phase_durations.for_kind(state.phase);
        self.repository.create_phase(game_id, state.clone(), deadline).await?;
        self.notify_scheduler(deadline);
        self.broadcast(game_id, EventKind::PhaseChanged).await;
        drop(game);

        // A freshly-minted retreat/build phase with nothing to do for any
        // power would otherwise block the game forever on an empty
        // adjustment; auto-resolve it immediately, possibly repeatedly.
        if matches!(state.phase, PhaseKind::Retreat | PhaseKind::Build)
            && !phase_has_legal_work(&state)
        {
            return Box::pin(self.resolve(game_id)).await;
        }

        Ok(())
    }

    /// Invoked by the Deadline Scheduler for every game whose deadline has
    /// elapsed.
    pub async fn deadline_tick(&self, game_id: GameId) -> Result<(), ServerError> {
        self.resolve(game_id).await
    }

    pub async fn vote_draw(&self, game_id: GameId, power: Power) -> Result<(), ServerError> {
        let mut game = self.store.lock(game_id).await?;
        if !game.draw_votes.contains(&power) {
            game.draw_votes.push(power);
        }
        let living: Vec<Power> = game.seats.iter().filter_map(|s| s.power).collect();
        let unanimous = living.iter().all(|p| game.draw_votes.contains(p));
        if unanimous {
            game.status = GameStatus::Finished;
            game.winner = None;
            drop(game);
            self.broadcast(game_id, EventKind::GameEnded).await;
        }
        Ok(())
    }

    async fn broadcast(&self, game_id: GameId, kind: EventKind) {
        self.hub
            .broadcast_to_game(Event::new(kind, game_id, serde_json::Value::Null))
            .await;
    }
}

/// A power has something to resolve this phase if it holds a unit
/// (movement), a dislodged unit (retreat), or a build/disband delta
/// (build) -- only such powers gate "all ready".
fn power_has_pending_action(phase: &crate::game::GamePhase, power: Power) -> bool {
    match phase.phase_kind {
        PhaseKind::Movement => phase.state_before.units.iter().any(|u| matches!(u, Some((p, _)) if *p == power)),
        PhaseKind::Retreat => phase.state_before.dislodged.iter().any(|d| matches!(d, Some(d) if d.power == power)),
        PhaseKind::Build => {
            let sc = phase.state_before.sc_owner.iter().filter(|o| **o == Some(power)).count();
            let units = phase.state_before.units.iter().filter(|u| matches!(u, Some((p, _)) if *p == power)).count();
            sc != units
        }
    }
}

/// True if any power has a unit to order (movement), a dislodgement to
/// retreat (retreat), or a build/disband delta (build) in `state`.
fn phase_has_legal_work(state: &BoardState) -> bool {
    match state.phase {
        PhaseKind::Movement => state.units.iter().any(Option::is_some),
        PhaseKind::Retreat => state.dislodged.iter().any(Option::is_some),
        PhaseKind::Build => ALL_POWERS.iter().any(|&power| {
            let sc = state.sc_owner.iter().filter(|o| **o == Some(power)).count();
            let units = state.units.iter().filter(|u| matches!(u, Some((p, _)) if *p == power)).count();
            sc != units
        }),
    }
}

/// Fills in a default hold order for every movement-phase unit that has no
/// submitted order, per the "missing orders default to hold" rule.
fn default_missing_holds(mut orders: Vec<(Order, Power)>, state: &BoardState) -> Vec<(Order, Power)> {
    if state.phase != PhaseKind::Movement {
        return orders;
    }
    let mut ordered = [false; crate::board::PROVINCE_COUNT];
    for (order, _) in &orders {
        if let Some(loc) = order_location(order) {
            ordered[loc as usize] = true;
        }
    }
    for (idx, unit) in state.units.iter().enumerate() {
        if let Some((power, unit_type)) = unit {
            if !ordered[idx] {
                let province = crate::board::ALL_PROVINCES[idx];
                orders.push((
                    Order::Hold {
                        unit: OrderUnit {
                            unit_type: *unit_type,
                            location: Location::with_coast(province, state.fleet_coast[idx].unwrap_or(crate::board::Coast::None)),
                        },
                    },
                    *power,
                ));
            }
        }
    }
    orders
}

fn order_location(order: &Order) -> Option<crate::board::Province> {
    match *order {
        Order::Hold { unit }
        | Order::Move { unit, .. }
        | Order::SupportHold { unit, .. }
        | Order::SupportMove { unit, .. }
        | Order::Convoy { unit, .. } => Some(unit.location.province),
        _ => None,
    }
}

fn orders_from_outcome(outcome: &AdjudicationOutcome) -> Vec<(Order, Power)> {
    match outcome {
        AdjudicationOutcome::Movement { results, .. } => {
            results.iter().map(|r| (r.order, r.power)).collect()
        }
        AdjudicationOutcome::Retreat { results } => results.iter().map(|r| (r.order, r.power)).collect(),
        AdjudicationOutcome::Build { results } => results.iter().map(|r| (r.order, r.power)).collect(),
    }
}
