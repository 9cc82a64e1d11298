//! Server configuration.
//!
//! Groups the tunables each component reads, built once at process start the
//! same way the Map Catalog is built once. Durations are accepted as human
//! strings (`"24h"`, `"5m"`) and parsed with `humantime`, matching how the
//! wire protocol describes phase timing.

use std::time::Duration;

use thiserror::Error;

/// Per-phase-kind default durations and scheduler/driver tuning knobs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub movement_duration: Duration,
    pub retreat_duration: Duration,
    pub build_duration: Duration,
    /// Default per-request deadline for durable operations (repository I/O).
    pub request_deadline: Duration,
    /// Bounded outbound queue capacity per Event Hub connection.
    pub event_queue_capacity: usize,
    /// Base wall-clock budget handed to an in-process bot strategy at the
    /// lowest difficulty tier; higher tiers scale this up.
    pub bot_base_budget: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            movement_duration: Duration::from_secs(24 * 3600),
            retreat_duration: Duration::from_secs(24 * 3600),
            build_duration: Duration::from_secs(24 * 3600),
            request_deadline: Duration::from_secs(30),
            event_queue_capacity: 256,
            bot_base_budget: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration {raw:?}: {source}")]
    InvalidDuration {
        raw: String,
        #[source]
        source: humantime::DurationError,
    },
}

/// Parses a duration string as accepted on the wire (`"24h"`, `"5m"`, ...).
pub fn parse_phase_duration(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|source| ConfigError::InvalidDuration {
        raw: raw.to_string(),
        source,
    })
}
