//! Deadline-driven phase resolution (C7).
//!
//! A single cooperative worker per process. It tracks the next wakeup
//! across all active games in a min-heap of deadlines, sleeping until the
//! earliest one (or being woken early whenever the Phase Service creates a
//! phase with an earlier deadline than anything it already knows about).
//! On each wake it asks the repository which phases have actually expired
//! -- the heap is only ever a hint for *when* to look, never the source of
//! truth for *what* to resolve, so a stale or duplicate heap entry just
//! costs an extra no-op pass rather than resolving the wrong phase.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::ids::GameId;
use crate::phase_service::PhaseService;
use crate::repository::PhaseRepository;

/// How long the worker sleeps when it has no known deadline to wait for.
/// It will still wake sooner if `notify` delivers an earlier one.
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Handle used by other components (chiefly the Phase Service, after
/// `create_phase`) to tell the scheduler about a new deadline to watch.
#[derive(Clone)]
pub struct SchedulerHandle {
    wake_tx: mpsc::UnboundedSender<Instant>,
}

impl SchedulerHandle {
    pub fn notify(&self, deadline: Instant) {
        // The worker may have already shut down; a dropped receiver is not
        // an error the caller needs to react to.
        let _ = self.wake_tx.send(deadline);
    }
}

/// Owns the background task. Dropping the last `SchedulerHandle` and then
/// this struct lets the worker finish its in-flight tick and exit.
pub struct DeadlineScheduler {
    task: tokio::task::JoinHandle<()>,
    shutdown: Arc<tokio::sync::Notify>,
    handle: SchedulerHandle,
}

impl DeadlineScheduler {
    /// Spawns the worker, seeding its heap from every game's current
    /// deadline so a restart doesn't lose track of already-scheduled
    /// phases.
    pub fn spawn(
        repository: Arc<dyn PhaseRepository>,
        phase_service: Arc<PhaseService>,
        game_ids: Vec<GameId>,
    ) -> Self {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(tokio::sync::Notify::new());
        let handle = SchedulerHandle { wake_tx: wake_tx.clone() };

        let worker_shutdown = shutdown.clone();
        let task = tokio::spawn(run_worker(repository, phase_service, game_ids, wake_rx, worker_shutdown));

        DeadlineScheduler { task, shutdown, handle }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Signals the worker to stop after completing any in-flight tick.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.task.await;
    }
}

async fn run_worker(
    repository: Arc<dyn PhaseRepository>,
    phase_service: Arc<PhaseService>,
    seed_game_ids: Vec<GameId>,
    mut wake_rx: mpsc::UnboundedReceiver<Instant>,
    shutdown: Arc<tokio::sync::Notify>,
) {
    let mut heap: BinaryHeap<Reverse<Instant>> = BinaryHeap::new();
    let now = Instant::now();
    for game_id in seed_game_ids {
        if let Ok(phase) = repository.fetch_current_phase(game_id).await {
            if !phase.is_resolved() {
                heap.push(Reverse(phase.deadline.max(now)));
            }
        }
    }

    loop {
        let sleep_for = match heap.peek() {
            Some(Reverse(deadline)) => deadline.saturating_duration_since(Instant::now()),
            None => IDLE_POLL_INTERVAL,
        };

        tokio::select! {
            _ = shutdown.notified() => {
                run_tick(&repository, &phase_service).await;
                break;
            }
            _ = tokio::time::sleep(sleep_for) => {
                if let Some(Reverse(_)) = heap.peek() {
                    heap.pop();
                }
                run_tick(&repository, &phase_service).await;
            }
            woken = wake_rx.recv() => {
                match woken {
                    Some(deadline) => heap.push(Reverse(deadline)),
                    None => {
                        run_tick(&repository, &phase_service).await;
                        break;
                    }
                }
            }
        }
    }
}

/// Resolves every currently-expired phase across all games, in deadline
/// order (the repository already returns them that way from its scan).
async fn run_tick(repository: &Arc<dyn PhaseRepository>, phase_service: &Arc<PhaseService>) {
    let expired = match repository.list_expired_phases(Instant::now()).await {
        Ok(ids) => ids,
        Err(e) => {
            log::warn!("deadline scheduler: failed to list expired phases: {e}");
            return;
        }
    };
    for game_id in expired {
        if let Err(e) = phase_service.deadline_tick(game_id).await {
            log::warn!("deadline scheduler: tick failed for game {game_id:?}: {e}");
        }
    }
}
