//! Engine state management.
//!
//! Holds the current board position, active power, and engine options, and
//! produces orders for the `go` command by sampling random legal order sets
//! and keeping whichever scores best under the heuristic evaluator within
//! the configured search time. This is the synchronous counterpart to
//! `bot_driver::HeuristicStrategy`, used here by the standalone DUI binary
//! instead of the async server.

use std::collections::HashMap;
use std::io::Write;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::board::province::Power;
use crate::board::state::{BoardState, Phase};
use crate::board::Order;
use crate::eval::evaluate;
use crate::movegen::random_orders;
use crate::protocol::dfen::parse_dfen;
use crate::protocol::dson::format_orders;
use crate::resolve::{apply_resolution, Resolver};

/// Default search time in milliseconds.
const DEFAULT_MOVETIME_MS: u64 = 5000;

/// Holds the mutable state of the engine between commands.
pub struct Engine {
    pub position: Option<BoardState>,
    pub active_power: Option<Power>,
    pub options: HashMap<String, String>,
    rng: SmallRng,
    resolver: Resolver,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates a new engine with no position or active power.
    pub fn new() -> Self {
        Engine {
            position: None,
            active_power: None,
            options: HashMap::new(),
            rng: SmallRng::from_entropy(),
            resolver: Resolver::new(32),
        }
    }

    /// Resets all engine state for a new game.
    pub fn new_game(&mut self) {
        self.position = None;
        self.active_power = None;
    }

    /// Sets the current board position from a DFEN string.
    /// Returns an error message on failure.
    pub fn set_position(&mut self, dfen: &str) -> Result<(), String> {
        match parse_dfen(dfen) {
            Ok(state) => {
                self.position = Some(state);
                Ok(())
            }
            Err(e) => Err(format!("failed to parse DFEN: {}", e)),
        }
    }

    /// Sets the active power.
    pub fn set_power(&mut self, power: Power) {
        self.active_power = Some(power);
    }

    /// Sets an engine option.
    pub fn set_option(&mut self, name: String, value: Option<String>) {
        self.options.insert(name, value.unwrap_or_default());
    }

    /// Returns the configured search time from options, or the default.
    fn movetime(&self) -> Duration {
        let ms = self
            .options
            .get("SearchTime")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MOVETIME_MS);
        Duration::from_millis(ms)
    }

    /// Returns the configured sample count from options, or a default
    /// scaled by Strength.
    fn sample_count(&self) -> u32 {
        let strength = self
            .options
            .get("Strength")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100)
            .clamp(1, 100);
        (strength as u32 / 2).max(1)
    }

    /// Samples movement order sets, resolves each against a scratch copy
    /// of the board with every other unit holding, and keeps whichever
    /// scores best for `power` under the heuristic evaluator.
    fn best_movement_orders(&mut self, power: Power) -> Vec<Order> {
        let state = self.position.as_ref().expect("position set").clone();
        let deadline = Instant::now() + self.movetime();
        let samples = self.sample_count();

        let mut best_orders = random_orders(power, &state, &mut self.rng);
        let mut best_score = f32::NEG_INFINITY;

        for _ in 0..samples {
            if Instant::now() >= deadline {
                break;
            }
            let candidate = random_orders(power, &state, &mut self.rng);
            let full_orders = fill_other_powers_with_holds(&state, power, &candidate);
            let (results, dislodged) = self.resolver.resolve(&full_orders, &state);
            let mut scratch = state.clone();
            apply_resolution(&mut scratch, &results, &dislodged);
            let score = evaluate(power, &scratch);
            if score > best_score {
                best_score = score;
                best_orders = candidate;
            }
        }

        best_orders
    }

    /// Handles the DUI handshake: writes id, options, protocol_version, and duiok.
    pub fn handle_dui<W: Write>(&self, out: &mut W) {
        writeln!(out, "id name realpolitik").unwrap();
        writeln!(out, "id author polite-betrayal").unwrap();
        writeln!(out, "option name Threads type spin default 4 min 1 max 64").unwrap();
        writeln!(
            out,
            "option name SearchTime type spin default 5000 min 100 max 60000"
        )
        .unwrap();
        writeln!(
            out,
            "option name Strength type spin default 100 min 1 max 100"
        )
        .unwrap();
        writeln!(out, "protocol_version 1").unwrap();
        writeln!(out, "duiok").unwrap();
        out.flush().unwrap();
    }

    /// Handles the `isready` command.
    pub fn handle_isready<W: Write>(&self, out: &mut W) {
        writeln!(out, "readyok").unwrap();
        out.flush().unwrap();
    }

    /// Handles the `go` command: produces orders for the active power and
    /// writes `bestorders <dson>`.
    pub fn handle_go<W: Write>(&mut self, out: &mut W) {
        if self.position.is_none() {
            eprintln!("go: no position set");
            return;
        }

        let power = match self.active_power {
            Some(p) => p,
            None => {
                eprintln!("go: no active power set");
                return;
            }
        };

        let phase = self.position.as_ref().unwrap().phase;
        let orders = match phase {
            Phase::Movement => self.best_movement_orders(power),
            Phase::Retreat | Phase::Build => {
                let state = self.position.as_ref().unwrap().clone();
                random_orders(power, &state, &mut self.rng)
            }
        };

        let dson = format_orders(&orders);
        writeln!(out, "bestorders {}", dson).unwrap();
        out.flush().unwrap();
    }
}

/// Fills every unit not covered by `candidate` with a hold order, so the
/// resolver sees a complete order set when scoring a candidate for one
/// power against an otherwise-static board.
fn fill_other_powers_with_holds(state: &BoardState, power: Power, candidate: &[Order]) -> Vec<(Order, Power)> {
    let mut ordered = [false; crate::board::PROVINCE_COUNT];
    let mut out: Vec<(Order, Power)> = Vec::new();
    for order in candidate {
        if let Some(loc) = order_location(order) {
            ordered[loc as usize] = true;
        }
        out.push((*order, power));
    }
    for (idx, unit) in state.units.iter().enumerate() {
        if let Some((unit_power, unit_type)) = unit {
            if ordered[idx] {
                continue;
            }
            let province = crate::board::ALL_PROVINCES[idx];
            out.push((
                Order::Hold {
                    unit: crate::board::OrderUnit {
                        unit_type: *unit_type,
                        location: crate::board::Location::with_coast(
                            province,
                            state.fleet_coast[idx].unwrap_or(crate::board::Coast::None),
                        ),
                    },
                },
                *unit_power,
            ));
        }
    }
    out
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
