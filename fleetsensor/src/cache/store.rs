//! Per-entity cache with single-flight fetch control.
//!
//! One [`CacheEntry`](super::entry::CacheEntry) per entity id, created
//! lazily and mutated only while its own `searching` flag is held. The flag
//! serializes mutation per entity while unrelated entities fetch fully in
//! parallel; the engine facade drives the begin/complete protocol around the
//! actual remote search.

use super::entry::{CacheEntry, SensorData};
use super::merge::merge_hit;
use crate::config::EngineSettings;
use crate::reading::EntityId;
use crate::search::{AttemptMode, SearchHit};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Outcome of a fetch admission check.
#[derive(Debug)]
pub(crate) enum BeginFetch {
    /// A search chain is already in flight for this entity.
    Busy,
    /// Cached data is still within its lifetime; no remote call. Carries a
    /// snapshot when the release-stale override was armed.
    Fresh { armed_snapshot: Option<SensorData> },
    /// The caller should run a search chain in the given mode.
    Search { mode: AttemptMode },
}

/// How a failed search chain resolves for the caller.
#[derive(Debug)]
pub(crate) struct MissDisposition {
    /// The entity has never produced data; surfaces the not-found sentinel.
    pub first_time: bool,
    /// Stale data to hand back anyway (release-stale override).
    pub stale_snapshot: Option<SensorData>,
}

/// Cache of per-entity sensor data.
pub struct SensorCache {
    entries: DashMap<EntityId, CacheEntry>,
}

impl SensorCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Admit or reject a fetch, claiming the single-flight slot when a
    /// search is warranted.
    pub(crate) fn begin_fetch(&self, entity: &EntityId) -> BeginFetch {
        let mut entry = self
            .entries
            .entry(entity.clone())
            .or_insert_with(CacheEntry::new);

        if entry.searching {
            return BeginFetch::Busy;
        }
        if entry.is_fresh(Instant::now()) {
            let armed_snapshot = if entry.release_stale_once {
                entry.release_stale_once = false;
                entry.data.clone()
            } else {
                None
            };
            return BeginFetch::Fresh { armed_snapshot };
        }

        entry.searching = true;
        // Pessimistic until a merge proves otherwise.
        entry.no_data_found = true;
        let mode = if entry.first_time {
            AttemptMode::First
        } else {
            AttemptMode::Repeat
        };
        BeginFetch::Search { mode }
    }

    /// Fold a successful search into the entry and release the slot.
    ///
    /// Returns the merged snapshot and the number of changed locations.
    pub(crate) fn complete_hit(
        &self,
        entity: &EntityId,
        hit: SearchHit,
        settings: &EngineSettings,
        lifetime: Duration,
    ) -> (Option<SensorData>, usize) {
        let Some(mut entry) = self.entries.get_mut(entity) else {
            warn!(entity = %entity, "search completed for an entry removed mid-flight");
            return (None, 0);
        };

        let changed = merge_hit(&mut entry.data, hit, settings);
        entry.searching = false;
        entry.first_time = false;
        entry.release_stale_once = false;
        entry.expires_at = Some(Instant::now() + lifetime);
        if changed > 0 {
            entry.no_data_found = false;
        }
        debug!(entity = %entity, changed, "search hit merged");
        (entry.data.clone(), changed)
    }

    /// Record a failed search chain and release the slot.
    ///
    /// Expiry is refreshed even on failure so the next call naturally
    /// retries instead of looping synchronously.
    pub(crate) fn complete_miss(
        &self,
        entity: &EntityId,
        transport: bool,
        lifetime: Duration,
    ) -> MissDisposition {
        let Some(mut entry) = self.entries.get_mut(entity) else {
            warn!(entity = %entity, "search failed for an entry removed mid-flight");
            return MissDisposition {
                first_time: true,
                stale_snapshot: None,
            };
        };

        entry.searching = false;
        entry.expires_at = Some(Instant::now() + lifetime);
        if transport {
            entry.soft_failures += 1;
            warn!(
                entity = %entity,
                soft_failures = entry.soft_failures,
                "transport failure folded into not-found"
            );
        }
        let stale_snapshot = if entry.release_stale_once {
            entry.release_stale_once = false;
            entry.data.clone()
        } else {
            None
        };
        MissDisposition {
            first_time: entry.first_time,
            stale_snapshot,
        }
    }

    /// Arm the one-shot override: the next fetch returns existing data even
    /// when the underlying attempt produces nothing new.
    pub fn arm_release_stale(&self, entity: &EntityId) {
        let mut entry = self
            .entries
            .entry(entity.clone())
            .or_insert_with(CacheEntry::new);
        entry.release_stale_once = true;
    }

    /// Whether the entity has any cached data.
    pub fn has_data(&self, entity: &EntityId) -> bool {
        self.entries
            .get(entity)
            .map(|entry| entry.data.is_some())
            .unwrap_or(false)
    }

    /// Transport failures folded into not-found outcomes for this entity.
    pub fn soft_failures(&self, entity: &EntityId) -> u32 {
        self.entries
            .get(entity)
            .map(|entry| entry.soft_failures)
            .unwrap_or(0)
    }

    /// Remove one entry, or every entry when `entity` is `None`.
    ///
    /// An entry mid-search is never deleted under its writer: removal is
    /// deferred via bounded polling and skipped (with a warning) if the
    /// search has not finished within the budget.
    pub async fn reset(
        &self,
        entity: Option<&EntityId>,
        poll_interval: Duration,
        poll_attempts: u32,
    ) {
        let targets: Vec<EntityId> = match entity {
            Some(entity) => vec![entity.clone()],
            None => self.entries.iter().map(|e| e.key().clone()).collect(),
        };

        for target in targets {
            let mut removed = false;
            for _ in 0..poll_attempts.max(1) {
                let busy = self
                    .entries
                    .get(&target)
                    .map(|entry| entry.searching)
                    .unwrap_or(false);
                if !busy {
                    self.entries.remove(&target);
                    removed = true;
                    break;
                }
                sleep(poll_interval).await;
            }
            if removed {
                debug!(entity = %target, "cache entry reset");
            } else {
                warn!(entity = %target, "entry still searching after poll budget; reset skipped");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn searching(&self, entity: &EntityId) -> bool {
        self.entries
            .get(entity)
            .map(|entry| entry.searching)
            .unwrap_or(false)
    }
}

impl Default for SensorCache {
    fn default() -> Self {
        Self::new()
    }
}
