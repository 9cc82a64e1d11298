//! Order submission validation and routing (C6).
//!
//! Pure validation against a phase's `state_before` plus a write-through to
//! the repository and a readiness signal to the Phase Service. Unlike the
//! adjudicator, which only ever marks individual orders void, a submission
//! here is rejected wholesale if any one order in it is invalid.

use std::collections::HashSet;
use std::sync::Arc;

use crate::board::{BoardState, Coast, Order, OrderUnit, Phase as PhaseKind, Power, Province, ALL_PROVINCES};
use crate::error::ServerError;
use crate::ids::GameId;
use crate::lifecycle::GameStore;
use crate::phase_service::PhaseService;
use crate::repository::PhaseRepository;

/// Validates a power's order submission against the current phase, then
/// routes the persist-and-broadcast to the Phase Service.
///
/// `submit` acquires and releases the per-game lock itself; callers must
/// call it *without* already holding that game's lock (e.g. a guard from
/// `GameStore::lock`). `tokio::sync::Mutex` is not reentrant, so a caller
/// that holds the guard across this call -- or across `BotDriver::drive_seat`
/// / `drive_game`, which route through here too -- will deadlock against
/// `PhaseService::submit`'s own re-acquisition of the same lock (see §5:
/// "only one game lock is ever held at a time; no nested game locks").
pub struct OrderService {
    store: Arc<GameStore>,
    repository: Arc<dyn PhaseRepository>,
    phase_service: Arc<PhaseService>,
}

impl OrderService {
    pub fn new(store: Arc<GameStore>, repository: Arc<dyn PhaseRepository>, phase_service: Arc<PhaseService>) -> Self {
        OrderService { store, repository, phase_service }
    }

    /// Submits `orders` on behalf of `user_power` in `game_id`.
    ///
    /// A submission that fully covers every unit, dislodgement, or
    /// build/disband slot the power owns this phase implicitly marks that
    /// power ready, the same signal an explicit MarkReady call would send.
    /// An incomplete submission never unmarks a power that was already
    /// ready -- readiness only ever moves forward from a submission, never
    /// back; unmarking stays an explicit, separate signal.
    ///
    /// Must be called without the caller already holding `game_id`'s game
    /// lock -- see the struct-level doc comment.
    pub async fn submit(&self, game_id: GameId, user_power: Power, orders: Vec<Order>) -> Result<(), ServerError> {
        {
            let game = self.store.lock(game_id).await?;
            if game.seat_for_power(user_power).is_none() {
                return Err(ServerError::NotInGame { game: game_id, power: Some(user_power) });
            }
        }

        let phase = self
            .repository
            .fetch_current_phase(game_id)
            .await
            .map_err(|_| ServerError::NoActivePhase(game_id))?;

        for order in &orders {
            validate_order(order, user_power, phase.phase_kind, &phase.state_before)?;
        }

        let complete = submission_is_complete(user_power, phase.phase_kind, &phase.state_before, &orders);
        self.phase_service.submit(game_id, user_power, orders).await?;
        if complete {
            self.phase_service.mark_ready(game_id, user_power).await?;
        }
        Ok(())
    }
}

/// True if `orders` covers every unit/dislodgement/build-or-disband slot
/// `power` has outstanding in `state_before` for `phase_kind`.
fn submission_is_complete(power: Power, phase_kind: PhaseKind, state_before: &BoardState, orders: &[Order]) -> bool {
    let covered: HashSet<Province> = orders.iter().filter_map(order_unit).map(|u| u.location.province).collect();

    match phase_kind {
        PhaseKind::Movement => state_before.units.iter().enumerate().all(|(idx, unit)| match unit {
            Some((p, _)) if *p == power => covered.contains(&ALL_PROVINCES[idx]),
            _ => true,
        }),
        PhaseKind::Retreat => state_before.dislodged.iter().enumerate().all(|(idx, d)| match d {
            Some(d) if d.power == power => covered.contains(&ALL_PROVINCES[idx]),
            _ => true,
        }),
        PhaseKind::Build => {
            let sc = state_before.sc_owner.iter().filter(|o| **o == Some(power)).count() as i32;
            let units = state_before.units.iter().filter(|u| matches!(u, Some((p, _)) if *p == power)).count() as i32;
            let slots_filled = orders
                .iter()
                .filter(|o| matches!(o, Order::Build { .. } | Order::Disband { .. } | Order::Waive))
                .count() as i32;
            slots_filled >= (sc - units).abs()
        }
    }
}

/// Checks one order against the submitter's power, the current phase kind,
/// and the board snapshot the phase was created with.
fn validate_order(
    order: &Order,
    submitter: Power,
    phase_kind: PhaseKind,
    state_before: &crate::board::BoardState,
) -> Result<(), ServerError> {
    let unit = order_unit(order);

    match (phase_kind, order) {
        (PhaseKind::Movement, Order::Hold { .. })
        | (PhaseKind::Movement, Order::Move { .. })
        | (PhaseKind::Movement, Order::SupportHold { .. })
        | (PhaseKind::Movement, Order::SupportMove { .. })
        | (PhaseKind::Movement, Order::Convoy { .. }) => {}
        (PhaseKind::Retreat, Order::Retreat { .. }) | (PhaseKind::Retreat, Order::Disband { .. }) => {}
        (PhaseKind::Build, Order::Build { .. })
        | (PhaseKind::Build, Order::Disband { .. })
        | (PhaseKind::Build, Order::Waive) => {}
        _ => {
            return Err(ServerError::InvalidOrder(format!(
                "order kind not legal for phase {phase_kind:?}"
            )))
        }
    }

    if let Some(unit) = unit {
        let idx = unit.location.province as usize;
        match phase_kind {
            PhaseKind::Movement => match state_before.units[idx] {
                Some((power, unit_type)) if power == submitter && unit_type == unit.unit_type => {}
                _ => {
                    return Err(ServerError::InvalidOrder(format!(
                        "no {:?} owned by {submitter:?} at {:?}",
                        unit.unit_type, unit.location.province
                    )))
                }
            },
            PhaseKind::Retreat => match state_before.dislodged[idx] {
                Some(d) if d.power == submitter && d.unit_type == unit.unit_type => {}
                _ => {
                    return Err(ServerError::InvalidOrder(format!(
                        "no dislodged {:?} owned by {submitter:?} at {:?}",
                        unit.unit_type, unit.location.province
                    )))
                }
            },
            PhaseKind::Build => {
                // Build orders name a target location rather than an
                // existing unit; disbands are checked against live units.
                if matches!(order, Order::Disband { .. }) {
                    match state_before.units[idx] {
                        Some((power, unit_type)) if power == submitter && unit_type == unit.unit_type => {}
                        _ => {
                            return Err(ServerError::InvalidOrder(format!(
                                "no {:?} owned by {submitter:?} at {:?} to disband",
                                unit.unit_type, unit.location.province
                            )))
                        }
                    }
                }
            }
        }

        let province_has_coasts = unit.location.province.has_coasts();
        let coast_required = unit.unit_type == crate::board::UnitType::Fleet && province_has_coasts;
        if unit.location.coast != Coast::None && !coast_required {
            return Err(ServerError::InvalidOrder(format!(
                "coast specified where not required at {:?}",
                unit.location.province
            )));
        }
    }

    Ok(())
}

fn order_unit(order: &Order) -> Option<OrderUnit> {
    match *order {
        Order::Hold { unit }
        | Order::Move { unit, .. }
        | Order::SupportHold { unit, .. }
        | Order::SupportMove { unit, .. }
        | Order::Convoy { unit, .. }
        | Order::Retreat { unit, .. }
        | Order::Disband { unit }
        | Order::Build { unit } => Some(unit),
        Order::Waive => None,
    }
}
