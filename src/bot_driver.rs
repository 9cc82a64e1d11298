//! Bot order production for seated bot players (C8).
//!
//! Two `BotStrategy` implementations back the difficulty tiers a seat can
//! be assigned: an in-process strategy (random legal orders, or a
//! bounded-sample heuristic search for movement phases) and an
//! external-process strategy that drives a child engine over the DUI wire
//! protocol. The `BotDriver` owns one task per active game and serializes
//! order production for that game's bot seats, so at most one request is
//! outstanding per (game, power) at a time.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::board::{BoardState, Location, Order, OrderUnit, Phase as PhaseKind, Power};
use crate::error::ServerError;
use crate::eval::evaluate;
use crate::game::BotDifficulty;
use crate::ids::GameId;
use crate::movegen::random_orders;
use crate::order_service::OrderService;
use crate::protocol::{encode_dfen, format_orders, parse_orders};
use crate::resolve::{apply_resolution, Resolver};

/// Produces one power's orders for the current phase. Implementations must
/// never fail outright -- on any internal error they should fall back to a
/// legal-but-weak order set so one bot's failure never stalls the game.
#[async_trait]
pub trait BotStrategy: Send + Sync {
    async fn produce_orders(&mut self, board: &BoardState, power: Power, budget: Duration) -> Vec<Order>;
}

/// Lowest in-process tier: one random legal order per unit/dislodgement/slot.
pub struct RandomStrategy {
    rng: SmallRng,
}

impl RandomStrategy {
    pub fn new() -> Self {
        RandomStrategy { rng: SmallRng::from_entropy() }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BotStrategy for RandomStrategy {
    async fn produce_orders(&mut self, board: &BoardState, power: Power, _budget: Duration) -> Vec<Order> {
        random_orders(power, board, &mut self.rng)
    }
}

/// Highest in-process tier: samples several random legal movement order
/// sets, resolves each against a scratch copy of the board, and keeps
/// whichever scores best for `power` under the heuristic evaluator. Retreat
/// and build phases fall back to a single random legal choice, since their
/// branching factor is small enough that sampling adds little.
pub struct HeuristicStrategy {
    rng: SmallRng,
    resolver: Resolver,
    max_samples: u32,
}

impl HeuristicStrategy {
    pub fn new(max_samples: u32) -> Self {
        HeuristicStrategy {
            rng: SmallRng::from_entropy(),
            resolver: Resolver::new(32),
            max_samples: max_samples.max(1),
        }
    }
}

#[async_trait]
impl BotStrategy for HeuristicStrategy {
    async fn produce_orders(&mut self, board: &BoardState, power: Power, budget: Duration) -> Vec<Order> {
        if board.phase != PhaseKind::Movement {
            return random_orders(power, board, &mut self.rng);
        }

        let deadline = Instant::now() + budget;
        let mut best_orders = random_orders(power, board, &mut self.rng);
        let mut best_score = f32::NEG_INFINITY;

        for _ in 0..self.max_samples {
            if Instant::now() >= deadline {
                break;
            }
            let candidate = random_orders(power, board, &mut self.rng);
            let full_orders = fill_other_powers_with_holds(board, power, &candidate);
            let (results, dislodged) = self.resolver.resolve(&full_orders, board);
            let mut scratch = board.clone();
            apply_resolution(&mut scratch, &results, &dislodged);
            let score = evaluate(power, &scratch);
            if score > best_score {
                best_score = score;
                best_orders = candidate;
            }
        }

        best_orders
    }
}

/// Fills every unit not covered by `candidate` with a hold order so the
/// resolver sees a complete order set, matching the "missing orders
/// default to hold" adjudication rule. Other powers are assumed to hold;
/// this only matters for scoring a candidate, never for the real
/// adjudication, which always uses the actual submitted orders.
fn fill_other_powers_with_holds(board: &BoardState, power: Power, candidate: &[Order]) -> Vec<(Order, Power)> {
    let mut ordered = [false; crate::board::PROVINCE_COUNT];
    let mut out: Vec<(Order, Power)> = Vec::new();
    for order in candidate {
        if let Some(loc) = order_location(order) {
            ordered[loc as usize] = true;
        }
        out.push((*order, power));
    }
    for (idx, unit) in board.units.iter().enumerate() {
        if let Some((unit_power, unit_type)) = unit {
            if ordered[idx] {
                continue;
            }
            let province = crate::board::ALL_PROVINCES[idx];
            out.push((
                Order::Hold {
                    unit: OrderUnit {
                        unit_type: *unit_type,
                        location: Location::with_coast(province, board.fleet_coast[idx].unwrap_or(crate::board::Coast::None)),
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

/// Orders that hold every one of `power`'s units -- the universal fallback
/// when an external process fails, times out, or emits garbage.
fn hold_everything(board: &BoardState, power: Power) -> Vec<Order> {
    let mut orders = Vec::new();
    for (idx, unit) in board.units.iter().enumerate() {
        if let Some((unit_power, unit_type)) = unit {
            if *unit_power != power {
                continue;
            }
            let province = crate::board::ALL_PROVINCES[idx];
            orders.push(Order::Hold {
                unit: OrderUnit {
                    unit_type: *unit_type,
                    location: Location::with_coast(province, board.fleet_coast[idx].unwrap_or(crate::board::Coast::None)),
                },
            });
        }
    }
    orders
}

/// A spawned child process implementing the DUI protocol, plus enough
/// plumbing to send a line and read one back.
struct EngineChild {
    child: Child,
    stdin: tokio::process::ChildStdin,
    stdout: BufReader<tokio::process::ChildStdout>,
}

/// Drives an external engine process through the DUI handshake and
/// per-phase `go` exchange described in the bot child-process protocol.
/// The child is assumed stateless across phases: the full board is sent
/// with every request, so a crash or hang never corrupts game state --
/// the driver just restarts it lazily on the next use.
pub struct ExternalProcessStrategy {
    command: String,
    args: Vec<String>,
    child: Option<EngineChild>,
}

impl ExternalProcessStrategy {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        ExternalProcessStrategy { command: command.into(), args, child: None }
    }

    async fn ensure_spawned(&mut self) -> std::io::Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        let mut engine = EngineChild { child, stdin, stdout };

        engine.stdin.write_all(b"dui\n").await?;
        engine.stdin.flush().await?;
        let mut line = String::new();
        loop {
            line.clear();
            let n = engine.stdout.read_line(&mut line).await?;
            if n == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "engine closed during handshake"));
            }
            if line.trim() == "duiok" {
                break;
            }
        }
        self.child = Some(engine);
        Ok(())
    }

    async fn request_orders(&mut self, board: &BoardState, power: Power, budget: Duration) -> std::io::Result<Vec<Order>> {
        self.ensure_spawned().await?;
        let engine = self.child.as_mut().expect("just spawned");

        let dfen = encode_dfen(board);
        let power_name = power.name();
        let movetime_ms = budget.as_millis().max(1);
        engine.stdin.write_all(format!("position {dfen}\n").as_bytes()).await?;
        engine.stdin.write_all(format!("setpower {power_name}\n").as_bytes()).await?;
        engine.stdin.write_all(format!("go movetime {movetime_ms}\n").as_bytes()).await?;
        engine.stdin.flush().await?;

        let mut line = String::new();
        loop {
            line.clear();
            let n = engine.stdout.read_line(&mut line).await?;
            if n == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "engine closed mid-turn"));
            }
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("bestorders ") {
                return parse_orders(rest)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()));
            }
            // "info" lines and anything else are diagnostic chatter, ignored.
        }
    }

    /// Kills and forgets the child so the next request spawns a fresh one.
    async fn restart(&mut self) {
        if let Some(mut engine) = self.child.take() {
            let _ = engine.child.kill().await;
        }
    }
}

#[async_trait]
impl BotStrategy for ExternalProcessStrategy {
    async fn produce_orders(&mut self, board: &BoardState, power: Power, budget: Duration) -> Vec<Order> {
        let overrun = budget.saturating_mul(2);
        match timeout(overrun, self.request_orders(board, power, budget)).await {
            Ok(Ok(orders)) if !orders.is_empty() => orders,
            Ok(Ok(_)) => {
                log::warn!("bot driver: engine for {power:?} returned empty orders, falling back to hold");
                self.restart().await;
                hold_everything(board, power)
            }
            Ok(Err(e)) => {
                log::warn!("bot driver: engine for {power:?} failed ({e}), falling back to hold");
                self.restart().await;
                hold_everything(board, power)
            }
            Err(_) => {
                log::warn!("bot driver: engine for {power:?} exceeded 2x budget, killing and falling back to hold");
                self.restart().await;
                hold_everything(board, power)
            }
        }
    }
}

/// Picks the concrete strategy for a bot-difficulty tier. External-process
/// difficulty is the caller's choice (a non-`None` command); the two
/// in-process tiers never shell out.
pub fn strategy_for_difficulty(difficulty: BotDifficulty) -> Box<dyn BotStrategy> {
    match difficulty {
        BotDifficulty::Easy => Box::new(RandomStrategy::new()),
        BotDifficulty::Medium => Box::new(HeuristicStrategy::new(16)),
        BotDifficulty::Hard => Box::new(HeuristicStrategy::new(64)),
    }
}

/// Drives bot order production for every bot seat across every active
/// game. One entry per (game, power) holds that seat's strategy behind a
/// mutex, so a single driver task per game serializes bot order
/// production for that game without blocking other games.
pub struct BotDriver {
    strategies: DashMap<(GameId, Power), Arc<Mutex<Box<dyn BotStrategy>>>>,
    order_service: Arc<OrderService>,
    base_budget: Duration,
}

impl BotDriver {
    pub fn new(order_service: Arc<OrderService>, base_budget: Duration) -> Self {
        BotDriver { strategies: DashMap::new(), order_service, base_budget }
    }

    /// Registers (or replaces) the strategy backing a bot seat.
    pub fn set_strategy(&self, game_id: GameId, power: Power, strategy: Box<dyn BotStrategy>) {
        self.strategies.insert((game_id, power), Arc::new(Mutex::new(strategy)));
    }

    pub fn remove_strategy(&self, game_id: GameId, power: Power) {
        self.strategies.remove(&(game_id, power));
    }

    /// Produces and submits orders for one bot seat against the current
    /// phase's board snapshot. Budget scales with difficulty via the
    /// strategy itself; this just enforces "at most one outstanding
    /// request per (game, power)" through the per-seat mutex.
    ///
    /// Takes `game_id` rather than a locked `Game` -- `OrderService::submit`
    /// acquires the per-game lock itself, so callers must not already hold
    /// it when calling this (see `OrderService`'s doc comment).
    pub async fn drive_seat(
        &self,
        game_id: GameId,
        power: Power,
        board: &BoardState,
    ) -> Result<(), ServerError> {
        let Some(entry) = self.strategies.get(&(game_id, power)) else {
            return Ok(());
        };
        let strategy = entry.clone();
        drop(entry);
        let mut strategy = strategy.lock().await;
        let orders = strategy.produce_orders(board, power, self.base_budget).await;
        self.order_service.submit(game_id, power, orders).await
    }

    /// Drives every bot seat in `seats` against `game_id`'s current phase.
    /// `seats` should be a snapshot taken without holding the game lock
    /// across this call -- `drive_seat` re-acquires it per seat.
    pub async fn drive_game(&self, game_id: GameId, seats: &[crate::game::Seat], board: &BoardState) {
        for seat in seats {
            if !seat.is_bot {
                continue;
            }
            let Some(power) = seat.power else { continue };
            if let Err(e) = self.drive_seat(game_id, power, board).await {
                log::warn!("bot driver: seat {power:?} in game {game_id} failed to submit: {e}");
            }
        }
    }
}
