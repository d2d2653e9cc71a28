//! Wire types for the remote batch-query service.

use crate::reading::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Remote identifier of a sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One channel query, scoped to an entity and a `[from, to)` window in unix
/// seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelQuery {
    pub channel_id: ChannelId,
    pub entity_id: EntityId,
    pub from: i64,
    pub to: i64,
}

/// Raw record as returned by the remote service, one per sample.
///
/// Untrusted input: the classifier validates every field before a record
/// becomes a [`Reading`](crate::reading::Reading).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Record identifier; empty ids are discarded.
    pub id: String,
    /// Sample time, unix seconds.
    pub time: i64,
    /// Entity the sample belongs to.
    pub entity_id: String,
    /// Source channel.
    pub channel_id: ChannelId,
    /// Raw sample value in the channel's native unit.
    pub data: f64,
}

/// Resolved channel metadata, returned by the catalog-resolution call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub remote_id: ChannelId,
    pub unit: String,
}

/// Transport and decode failures from the remote query service.
///
/// These never escape the engine API: the search protocol either recovers
/// by retrying or folds the failure into a not-found outcome.
#[derive(Debug, Error)]
pub enum QueryError {
    /// HTTP-level failure (connect, timeout).
    #[error("query transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded.
    #[error("query decode error: {0}")]
    Decode(String),

    /// The service answered with an application-level error.
    #[error("query service error: {0}")]
    Service(String),
}
