//! Engine-facing error taxonomy.
//!
//! `Busy` and `NotFound` are routine control signals, not faults: they carry
//! the configured sentinel messages and no transport detail. Transport
//! failures are recovered (or folded into `NotFound`) inside the search
//! protocol and never escape here.

use thiserror::Error;

/// Rejections surfaced by [`fetch_cached_sensor_data`]
/// (crate::engine::TelemetryEngine::fetch_cached_sensor_data).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// A search chain for this entity is already in flight; no remote call
    /// was issued.
    #[error("{message}")]
    Busy { message: String },

    /// The retry budget was exhausted and the entity has never produced
    /// data.
    #[error("{message}")]
    NotFound { message: String },
}
