//! Hosting-server process entry point.
//!
//! Wires the game-lifecycle, phase/order services, event hub, deadline
//! scheduler, and bot driver together into one running process. There is
//! no HTTP/WebSocket surface here -- that transport layer is out of scope
//! -- so this binary's job is solely to own the component graph and keep
//! it alive; a future transport binary would sit in front of the same
//! `Arc`-shared services constructed here.

use std::sync::Arc;

use clap::Parser;
use concordat::config::ServerConfig;
use concordat::event_hub::EventHub;
use concordat::lifecycle::GameStore;
use concordat::order_service::OrderService;
use concordat::phase_service::PhaseService;
use concordat::repository::{InMemoryRepository, PhaseRepository};
use concordat::scheduler::DeadlineScheduler;

/// Hosting-server process for the seven-power negotiation board game.
#[derive(Parser, Debug)]
#[command(name = "concordat-server", about = "Game-phase hosting server")]
struct Args {
    /// Bounded outbound event-queue capacity per connection.
    #[arg(long)]
    event_queue_capacity: Option<usize>,

    /// Base think-time budget handed to bot strategies, e.g. "5s".
    #[arg(long)]
    bot_base_budget: Option<String>,

    /// Per-request deadline for synchronous order/readiness calls, e.g. "30s".
    #[arg(long)]
    request_deadline: Option<String>,
}

fn build_config(args: &Args) -> Result<ServerConfig, concordat::config::ConfigError> {
    let mut config = ServerConfig::default();
    if let Some(capacity) = args.event_queue_capacity {
        config.event_queue_capacity = capacity;
    }
    if let Some(raw) = &args.bot_base_budget {
        config.bot_base_budget = concordat::config::parse_phase_duration(raw)?;
    }
    if let Some(raw) = &args.request_deadline {
        config.request_deadline = concordat::config::parse_phase_duration(raw)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            log::error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    log::info!(
        "starting server: event_queue_capacity={} bot_base_budget={:?} request_deadline={:?}",
        config.event_queue_capacity,
        config.bot_base_budget,
        config.request_deadline,
    );

    let store = Arc::new(GameStore::new());
    let hub = Arc::new(EventHub::new(config.event_queue_capacity));
    let repository: Arc<dyn PhaseRepository> = Arc::new(InMemoryRepository::new());
    let phase_service = Arc::new(PhaseService::new(store.clone(), repository.clone(), hub.clone()));
    let order_service = Arc::new(OrderService::new(store.clone(), repository.clone(), phase_service.clone()));
    let _bot_driver = Arc::new(concordat::bot_driver::BotDriver::new(
        order_service.clone(),
        config.bot_base_budget,
    ));
    let _lifecycle = concordat::lifecycle::GameLifecycle::new(store.clone(), hub.clone());

    let scheduler = DeadlineScheduler::spawn(repository.clone(), phase_service.clone(), store.game_ids());
    phase_service.attach_scheduler(scheduler.handle());

    log::info!("server stack initialized, awaiting shutdown signal");
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for ctrl-c: {e}");
    }

    log::info!("shutting down");
    scheduler.shutdown().await;
}
