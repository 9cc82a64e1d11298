//! Top-level adjudicator entry point.
//!
//! Dispatches to the movement, retreat, or build resolver according to the
//! board state's current phase, applies the outcome, and advances the state
//! to the next phase. This is the single call the Phase Service makes to
//! turn a batch of submitted orders into a resolved phase; it never fails --
//! unresolvable orders are simply marked void by the underlying resolver.

use crate::board::{BoardState, Order, Phase, Power};

use super::build::{apply_builds, resolve_builds, BuildResult};
use super::kruijswijk::{apply_resolution, resolve_orders, DislodgedUnit, ResolvedOrder};
use super::phase::advance_state;
use super::retreat::{apply_retreats, resolve_retreats, RetreatResult};

/// The per-order outcomes of one adjudicated phase, tagged by phase kind.
#[derive(Debug, Clone)]
pub enum AdjudicationOutcome {
    Movement {
        results: Vec<ResolvedOrder>,
        dislodged: Vec<DislodgedUnit>,
    },
    Retreat {
        results: Vec<RetreatResult>,
    },
    Build {
        results: Vec<BuildResult>,
    },
}

/// Resolves `orders` against `state`'s current phase, mutates `state` in
/// place to the post-resolution board, and advances it to the next phase.
///
/// Orders belonging to a power other than the one that issued them, or for
/// a phase other than `state.phase`, are the caller's responsibility to
/// filter out before calling this -- the resolvers here trust the phase
/// kind implied by the order variant matches `state.phase`.
pub fn adjudicate(state: &mut BoardState, orders: &[(Order, Power)]) -> AdjudicationOutcome {
    match state.phase {
        Phase::Movement => {
            let (results, dislodged) = resolve_orders(orders, state);
            apply_resolution(state, &results, &dislodged);
            advance_state(state, !dislodged.is_empty());
            AdjudicationOutcome::Movement { results, dislodged }
        }
        Phase::Retreat => {
            let results = resolve_retreats(orders, state);
            apply_retreats(state, &results);
            advance_state(state, false);
            AdjudicationOutcome::Retreat { results }
        }
        Phase::Build => {
            let results = resolve_builds(orders, state);
            apply_builds(state, &results);
            advance_state(state, false);
            AdjudicationOutcome::Build { results }
        }
    }
}
