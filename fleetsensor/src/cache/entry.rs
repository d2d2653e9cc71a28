//! Per-entity cache entry and the cached data shapes.

use crate::reading::{ComponentSensorSet, Segment, VehicleConfig};
use serde::Serialize;
use std::collections::HashMap;
use tokio::time::Instant;

/// Cached sensor data for one entity.
///
/// Single-segment vehicles keep one flat set; multi-segment vehicles keep
/// one optional set per segment (a segment whose fan-out search failed is
/// recorded as `None` rather than blocking the rest) plus the resolved
/// [`VehicleConfig`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorData {
    Single(ComponentSensorSet),
    Multi {
        segments: HashMap<Segment, Option<ComponentSensorSet>>,
        veh_cfg: VehicleConfig,
    },
}

impl SensorData {
    /// Total readings across all segments.
    pub fn reading_count(&self) -> usize {
        match self {
            SensorData::Single(set) => set.len(),
            SensorData::Multi { segments, .. } => segments
                .values()
                .filter_map(|set| set.as_ref())
                .map(|set| set.len())
                .sum(),
        }
    }

    /// The segment a single-shape set belongs to, read from its readings.
    pub(crate) fn single_segment(set: &ComponentSensorSet) -> Option<Segment> {
        set.iter().next().map(|reading| reading.segment.clone())
    }
}

/// One cache entry per entity id. Created lazily on first fetch, mutated in
/// place by every subsequent fetch, deleted only by an explicit reset.
#[derive(Debug, Default)]
pub(crate) struct CacheEntry {
    /// True for the duration of a search chain; enforces single-flight.
    pub searching: bool,
    /// True until any search chain for this entity succeeds. Controls
    /// window-ladder vs single-attempt behavior.
    pub first_time: bool,
    /// Pessimistic marker: set at search start, cleared when a merge pass
    /// changes at least one location.
    pub no_data_found: bool,
    /// One-shot override: the next fetch returns the stale cached data even
    /// when the underlying attempt produced nothing new.
    pub release_stale_once: bool,
    /// Transport failures folded into not-found outcomes, kept observable
    /// without changing the consumer contract.
    pub soft_failures: u32,
    /// Staleness horizon; refreshed after every completed attempt, success
    /// or failure.
    pub expires_at: Option<Instant>,
    /// Merged sensor data, if any search ever succeeded.
    pub data: Option<SensorData>,
}

impl CacheEntry {
    pub fn new() -> Self {
        Self {
            first_time: true,
            ..Self::default()
        }
    }

    /// Whether the cached data is still within its lifetime.
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.data.is_some() && self.expires_at.is_some_and(|expires| now < expires)
    }
}
