//! Order resolution.
//!
//! Resolves a set of simultaneous orders into outcomes (succeeds, fails,
//! dislodged) using the Kruijswijk algorithm for movement phases, with
//! dedicated resolvers for the retreat and build/disband phases and the
//! phase-sequencing rules that stitch a game-year together.

pub mod adjudicate;
pub mod build;
pub mod kruijswijk;
pub mod phase;
pub mod retreat;

pub use adjudicate::{adjudicate, AdjudicationOutcome};
pub use build::{apply_builds, resolve_builds, BuildResult};
pub use kruijswijk::{apply_resolution, resolve_orders, DislodgedUnit, OrderResult, ResolvedOrder, Resolver};
pub use phase::{advance_state, is_game_over, needs_build_phase, next_phase, update_sc_ownership};
pub use retreat::{apply_retreats, resolve_retreats, RetreatResult};
