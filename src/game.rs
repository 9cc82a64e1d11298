//! Game, seat, and phase data types for the hosting server.
//!
//! These are the server-side records the Phase Service and Game Lifecycle
//! mutate through a `PhaseRepository`; they sit one layer above the pure
//! `board` module, which only knows about a single snapshot, never about
//! games, seats, or deadlines.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::board::{BoardState, Order, Phase as PhaseKind, Power, Season};
use crate::ids::{GameId, PhaseId, UserId};

/// A game's place in its waiting/active/finished lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
}

/// How powers are handed out to seats at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAssignmentPolicy {
    Random,
    Manual,
}

/// Relative strength of an in-process or external bot strategy. Scales the
/// wall-clock budget and, for in-process strategies, which tier is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BotDifficulty {
    Easy,
    Medium,
    Hard,
}

/// One seat at the table: a human or bot, optionally assigned a power.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub user: UserId,
    pub power: Option<Power>,
    pub is_bot: bool,
    pub bot_difficulty: Option<BotDifficulty>,
}

impl Seat {
    pub fn human(user: UserId) -> Self {
        Seat { user, power: None, is_bot: false, bot_difficulty: None }
    }

    pub fn bot(user: UserId, difficulty: BotDifficulty) -> Self {
        Seat { user, power: None, is_bot: true, bot_difficulty: Some(difficulty) }
    }
}

/// Per-phase-kind deadline durations for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    pub movement: Duration,
    pub retreat: Duration,
    pub build: Duration,
}

impl PhaseDurations {
    pub fn for_kind(&self, kind: PhaseKind) -> Duration {
        match kind {
            PhaseKind::Movement => self.movement,
            PhaseKind::Retreat => self.retreat,
            PhaseKind::Build => self.build,
        }
    }
}

/// A single hosted game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub status: GameStatus,
    pub seats: Vec<Seat>,
    pub creator: UserId,
    pub phase_durations: PhaseDurations,
    pub power_assignment: PowerAssignmentPolicy,
    pub winner: Option<Power>,
    /// Powers that have cast a draw vote for the current state of play.
    pub draw_votes: Vec<Power>,
}

impl Game {
    pub fn new(
        id: GameId,
        name: String,
        creator: UserId,
        phase_durations: PhaseDurations,
        power_assignment: PowerAssignmentPolicy,
    ) -> Self {
        Game {
            id,
            name,
            status: GameStatus::Waiting,
            seats: Vec::new(),
            creator,
            phase_durations,
            power_assignment,
            winner: None,
            draw_votes: Vec::new(),
        }
    }

    /// The seat assigned to `power`, if any.
    pub fn seat_for_power(&self, power: Power) -> Option<&Seat> {
        self.seats.iter().find(|s| s.power == Some(power))
    }

    /// The power assigned to `user`, if the user holds a seat with one.
    pub fn power_for_user(&self, user: &UserId) -> Option<Power> {
        self.seats.iter().find(|s| &s.user == user).and_then(|s| s.power)
    }

    /// True once all seven seats exist and each has a distinct assigned power.
    pub fn is_ready_to_start(&self) -> bool {
        if self.seats.len() != 7 {
            return false;
        }
        let mut seen = [false; 7];
        for seat in &self.seats {
            match seat.power {
                Some(p) => {
                    let idx = p as usize;
                    if seen[idx] {
                        return false;
                    }
                    seen[idx] = true;
                }
                None => return false,
            }
        }
        true
    }
}

/// A single phase of a game: the unit of work the Phase Service advances.
///
/// `state_after` and `resolved_at` are `None` until resolution, at which
/// point they become immutable.
#[derive(Debug, Clone)]
pub struct GamePhase {
    pub id: PhaseId,
    pub game_id: GameId,
    pub year: u16,
    pub season: Season,
    pub phase_kind: PhaseKind,
    pub state_before: BoardState,
    pub state_after: Option<BoardState>,
    pub deadline: Instant,
    pub resolved_at: Option<Instant>,
    pub orders: HashMap<Power, Vec<Order>>,
    pub ready: HashMap<Power, bool>,
}

impl GamePhase {
    pub fn new(id: PhaseId, game_id: GameId, state_before: BoardState, deadline: Instant) -> Self {
        GamePhase {
            id,
            game_id,
            year: state_before.year,
            season: state_before.season,
            phase_kind: state_before.phase,
            state_before,
            state_after: None,
            deadline,
            resolved_at: None,
            orders: HashMap::new(),
            ready: HashMap::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state_after.is_some()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        !self.is_resolved() && self.deadline <= now
    }

    /// Replaces `power`'s submitted orders for this phase.
    pub fn set_orders(&mut self, power: Power, orders: Vec<Order>) {
        self.orders.insert(power, orders);
    }

    pub fn set_ready(&mut self, power: Power, ready: bool) {
        self.ready.insert(power, ready);
    }

    pub fn is_ready(&self, power: Power) -> bool {
        self.ready.get(&power).copied().unwrap_or(false)
    }

    /// Flattens the per-power order map into the `(Order, Power)` pairs the
    /// adjudicator consumes.
    pub fn orders_for_adjudication(&self) -> Vec<(Order, Power)> {
        self.orders
            .iter()
            .flat_map(|(&power, orders)| orders.iter().map(move |&o| (o, power)))
            .collect()
    }
}
