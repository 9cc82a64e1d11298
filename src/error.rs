//! Server-side error taxonomy.
//!
//! Every fallible operation in the repository/phase/order/scheduler/bot/hub/
//! lifecycle layer returns `Result<T, ServerError>`. The adjudicator itself
//! (see `resolve`) never fails -- it only marks individual orders void -- so
//! it has no error type of its own.

use thiserror::Error;

use crate::board::Power;
use crate::ids::{GameId, PhaseId};

/// The five error kinds the external HTTP collaborator maps to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    GameNotFound,
    NotInGame,
    NoActivePhase,
    InvalidOrder,
    Unauthorized,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("game {0:?} not found")]
    GameNotFound(GameId),

    #[error("power {power:?} is not seated in game {game:?}")]
    NotInGame { game: GameId, power: Option<Power> },

    #[error("game {0:?} has no active phase")]
    NoActivePhase(GameId),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("phase {0:?} is already resolved")]
    AlreadyResolved(PhaseId),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// The status-mapping category this error belongs to. The actual
    /// HTTP status mapping is owned by the out-of-scope handler collaborator;
    /// this only exposes enough structure for that mapping to be trivial.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::GameNotFound(_) => ErrorKind::GameNotFound,
            ServerError::NotInGame { .. } => ErrorKind::NotInGame,
            ServerError::NoActivePhase(_) => ErrorKind::NoActivePhase,
            ServerError::InvalidOrder(_) => ErrorKind::InvalidOrder,
            ServerError::Unauthorized => ErrorKind::Unauthorized,
            // "already resolved" is swallowed as idempotent success by callers
            // before it ever reaches this far; if it does leak out, it behaves
            // like an internal/no-op condition rather than a client error.
            ServerError::AlreadyResolved(_) => ErrorKind::Internal,
            ServerError::Repository(_) => ErrorKind::Internal,
            ServerError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Failures surfaced by a `PhaseRepository` implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("game {0:?} not found")]
    GameNotFound(GameId),

    #[error("game {0:?} has no unresolved phase")]
    NoCurrentPhase(GameId),

    #[error("phase {0:?} not found")]
    PhaseNotFound(PhaseId),

    #[error("storage backend failure: {0}")]
    Backend(String),
}
