//! Phase sequencing logic.
//!
//! Determines the next phase in the Diplomacy game year and advances
//! the board state accordingly. Ported from Go's `phase.go`.

use crate::board::{BoardState, Phase, Power, Season, ALL_POWERS, ALL_PROVINCES, PROVINCE_COUNT};

/// Computes the next (season, phase) given the current state and whether dislodgements occurred.
///
/// Phase flow:
/// - Spring Movement -> Spring Retreat (if dislodged) OR Fall Movement
/// - Spring Retreat  -> Fall Movement
/// - Fall Movement   -> Fall Retreat (if dislodged) OR Fall Build
/// - Fall Retreat    -> Fall Build
/// - Fall Build      -> Spring Movement (next year)
pub fn next_phase(state: &BoardState, has_dislodgements: bool) -> (Season, Phase) {
    match state.phase {
        Phase::Movement => {
            if has_dislodgements {
                return (state.season, Phase::Retreat);
            }
            after_movement(state.season)
        }
        Phase::Retreat => after_movement(state.season),
        Phase::Build => (Season::Spring, Phase::Movement),
    }
}

fn after_movement(season: Season) -> (Season, Phase) {
    match season {
        Season::Spring => (Season::Fall, Phase::Movement),
        Season::Fall => (Season::Fall, Phase::Build),
    }
}

/// Returns true if any power has a unit/SC mismatch requiring build/disband adjustments.
pub fn needs_build_phase(state: &BoardState) -> bool {
    for &power in &ALL_POWERS {
        let sc = state.sc_owner.iter().filter(|o| **o == Some(power)).count();
        let units = state
            .units
            .iter()
            .filter(|u| matches!(u, Some((p, _)) if *p == power))
            .count();
        if sc != units {
            return true;
        }
    }
    false
}

/// Updates supply center ownership: SCs are captured by the power whose unit occupies them.
/// This should be called after Fall movement resolution only.
pub fn update_sc_ownership(state: &mut BoardState) {
    for prov in &ALL_PROVINCES {
        if !prov.is_supply_center() {
            continue;
        }
        let idx = *prov as usize;
        if let Some((power, _)) = state.units[idx] {
            state.sc_owner[idx] = Some(power);
        }
        // If no unit present, ownership stays with current owner.
    }
}

/// Advances the board state to the next phase.
///
/// This handles:
/// - SC ownership updates after Fall movement/retreat
/// - Year increment when transitioning to Spring
/// - Clearing dislodged units when not entering retreat phase
pub fn advance_state(state: &mut BoardState, has_dislodgements: bool) {
    let (next_season, next_phase) = next_phase(state, has_dislodgements);

    // Update SC ownership after Fall movement only -- spring and retreat
    // resolutions must leave sc_owner untouched.
    if state.season == Season::Fall && state.phase == Phase::Movement {
        update_sc_ownership(state);
    }

    // Increment year when entering Spring movement.
    if next_season == Season::Spring && next_phase == Phase::Movement {
        state.year += 1;
    }

    state.season = next_season;
    state.phase = next_phase;

    // Clear dislodged units unless entering retreat phase.
    if next_phase != Phase::Retreat {
        state.dislodged = [None; PROVINCE_COUNT];
    }
}

/// Returns true if any single power controls 18+ supply centers (solo victory).
pub fn is_game_over(state: &BoardState) -> Option<Power> {
    for &power in &ALL_POWERS {
        let sc = state.sc_owner.iter().filter(|o| **o == Some(power)).count();
        if sc >= 18 {
            return Some(power);
        }
    }
    None
}
