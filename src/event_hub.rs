//! Per-game and per-user subscription multiplexer (C9).
//!
//! Two indexes -- by game and by user -- over a set of connections, each
//! with a bounded outbound queue. Broadcasts never block on a slow
//! connection: a full queue drops the event and logs, rather than
//! back-pressuring the broadcaster.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};

use crate::ids::{GameId, UserId};

/// The kinds of events the hub fans out. Carries only an opaque JSON-ish
/// payload; the handler collaborator owns wire encoding.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    PhaseChanged,
    PhaseResolved,
    PlayerReady,
    Message,
    GameStarted,
    GameEnded,
    PowerChanged,
}

/// One event pushed to subscribers of a game.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub game_id: GameId,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(kind: EventKind, game_id: GameId, data: serde_json::Value) -> Self {
        Event { kind, game_id, data }
    }
}

/// Opaque handle identifying one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// A registered connection: who it belongs to and its bounded outbound queue.
struct Connection {
    user: UserId,
    sender: mpsc::Sender<Event>,
}

/// Per-game and per-user connection indexes, guarded by a single
/// reader-writer lock. Broadcasts acquire the read side; register and
/// (un)subscribe mutations acquire the write side.
pub struct EventHub {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    by_game: RwLock<HashMap<GameId, HashSet<ConnectionId>>>,
    by_user: RwLock<HashMap<UserId, HashSet<ConnectionId>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl EventHub {
    pub fn new(queue_capacity: usize) -> Self {
        EventHub {
            connections: RwLock::new(HashMap::new()),
            by_game: RwLock::new(HashMap::new()),
            by_user: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity,
        }
    }

    /// Registers a new connection for `user` and returns its id plus the
    /// receiving half of its outbound queue.
    pub async fn register(&self, user: UserId) -> (ConnectionId, mpsc::Receiver<Event>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.connections.write().await.insert(id, Connection { user: user.clone(), sender: tx });
        self.by_user.write().await.entry(user).or_default().insert(id);
        (id, rx)
    }

    /// Removes a connection from every index and closes its queue.
    pub async fn unregister(&self, id: ConnectionId) {
        let removed = self.connections.write().await.remove(&id);
        if let Some(conn) = removed {
            self.by_user.write().await.entry(conn.user).and_modify(|s| {
                s.remove(&id);
            });
        }
        self.by_game.write().await.retain(|_, subs| {
            subs.remove(&id);
            !subs.is_empty()
        });
    }

    pub async fn subscribe(&self, id: ConnectionId, game_id: GameId) {
        self.by_game.write().await.entry(game_id).or_default().insert(id);
    }

    pub async fn unsubscribe(&self, id: ConnectionId, game_id: GameId) {
        if let Some(subs) = self.by_game.write().await.get_mut(&game_id) {
            subs.remove(&id);
        }
    }

    /// Sends `event` to every connection subscribed to its game. A
    /// connection whose queue is full has the event dropped and logged;
    /// the broadcaster never waits for it.
    pub async fn broadcast_to_game(&self, event: Event) {
        let subscriber_ids: Vec<ConnectionId> = {
            let by_game = self.by_game.read().await;
            match by_game.get(&event.game_id) {
                Some(subs) => subs.iter().copied().collect(),
                None => return,
            }
        };
        let connections = self.connections.read().await;
        for id in subscriber_ids {
            if let Some(conn) = connections.get(&id) {
                if conn.sender.try_send(event.clone()).is_err() {
                    log::warn!(
                        "event hub: dropping {:?} for game {:?}, connection {:?} queue full",
                        event.kind,
                        event.game_id,
                        id
                    );
                }
            }
        }
    }

    /// Sends `event` to every connection registered to `user`, regardless
    /// of game subscription (used for account-wide notifications).
    pub async fn broadcast_to_user(&self, user: &UserId, event: Event) {
        let ids: Vec<ConnectionId> = {
            let by_user = self.by_user.read().await;
            match by_user.get(user) {
                Some(subs) => subs.iter().copied().collect(),
                None => return,
            }
        };
        let connections = self.connections.read().await;
        for id in ids {
            if let Some(conn) = connections.get(&id) {
                if conn.sender.try_send(event.clone()).is_err() {
                    log::warn!("event hub: dropping {:?} for user {user}, connection {:?} queue full", event.kind, id);
                }
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscriber_count(&self, game_id: GameId) -> usize {
        self.by_game.read().await.get(&game_id).map(HashSet::len).unwrap_or(0)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        EventHub::new(256)
    }
}
