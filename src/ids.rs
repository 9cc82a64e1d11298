//! Opaque identifier newtypes for games, phases, and users.
//!
//! Kept as small `Copy` value types rather than heap-allocated ids, in
//! keeping with the board representation's preference for fixed-size,
//! trivially-copyable state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle to a game. Monotonically assigned by `IdGenerator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct GameId(pub u64);

/// Opaque handle to a phase. Strictly increasing within a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PhaseId(pub u64);

/// Opaque handle to a user account. The identity collaborator owns the
/// actual format; this crate only ever compares or stores it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "game-{}", self.0)
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase-{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide monotonic id allocator. A single instance is shared by the
/// Game Lifecycle (for game ids) and the Phase Service (for phase ids).
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub const fn new() -> Self {
        IdGenerator {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_game_id(&self) -> GameId {
        GameId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_phase_id(&self) -> PhaseId {
        PhaseId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
