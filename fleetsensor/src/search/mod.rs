//! Search-and-retry protocol over the remote query service.
//!
//! A first-time search walks an ascending ladder of time windows (1 day,
//! 2 days, ... 90 days by default) until data appears or the ladder is
//! exhausted. A repeat search makes exactly one attempt over a short window,
//! bounding the number of remote calls per refresh cycle.
//!
//! When an unscoped first-time search reveals a multi-segment vehicle, the
//! protocol fans out one independent, segment-scoped search per configured
//! segment that produced no data, and resolves only once every fan-out has
//! completed. A failed fan-out records its segment as absent without
//! blocking the others.

use crate::catalog::CatalogTable;
use crate::config::EngineSettings;
use crate::query::{build_queries, QueryClient};
use crate::reading::{classify, ComponentSensorSet, EntityId, Segment, VehicleConfig};
use crate::time::now_unix;
use futures::future::join_all;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

const SECS_PER_DAY: i64 = 86_400;

/// Which segments a search covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// All configured segments in one batch.
    AllSegments,
    /// One segment (used by fan-out searches).
    Segment(Segment),
}

/// Whether this is the entity's first search chain or a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptMode {
    /// Walk the full window ladder; one transport retry allowed.
    First,
    /// Single short-window attempt; any failure is folded into not-found.
    Repeat,
}

/// A successful search: per-segment data plus multi-segment bookkeeping.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Classified data per segment.
    pub found: HashMap<Segment, ComponentSensorSet>,
    /// Configured segments whose fan-out search found nothing; recorded as
    /// absent in the cache rather than blocking the result.
    pub missing: Vec<Segment>,
    /// Present when the vehicle resolved as multi-segment.
    pub veh_cfg: Option<VehicleConfig>,
}

/// Terminal search failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// The retry budget was exhausted without data. `transport` records
    /// whether a remote-call failure (rather than a clean empty result)
    /// ended the chain, so callers can count outages without changing the
    /// consumer-visible outcome.
    #[error("search exhausted with no data")]
    NotFound { transport: bool },
}

/// The search protocol, borrowing the client, loaded catalog, and settings.
pub struct SearchProtocol<'a, C: QueryClient> {
    client: &'a C,
    catalog: &'a CatalogTable,
    settings: &'a EngineSettings,
}

impl<'a, C: QueryClient> SearchProtocol<'a, C> {
    pub fn new(client: &'a C, catalog: &'a CatalogTable, settings: &'a EngineSettings) -> Self {
        Self {
            client,
            catalog,
            settings,
        }
    }

    /// Run one search chain for `entity`.
    ///
    /// # Errors
    ///
    /// [`SearchError::NotFound`] when the window ladder (first mode) or the
    /// single attempt (repeat mode) produced no data.
    pub async fn search(
        &self,
        entity: &EntityId,
        scope: SearchScope,
        mode: AttemptMode,
    ) -> Result<SearchHit, SearchError> {
        let segments: Vec<Segment> = match &scope {
            SearchScope::AllSegments => self.settings.segment_priority.clone(),
            SearchScope::Segment(segment) => vec![segment.clone()],
        };

        let found = match mode {
            AttemptMode::First => self.run_ladder(entity, &segments).await?,
            AttemptMode::Repeat => self.run_repeat(entity, &segments).await?,
        };

        match (&scope, mode) {
            // Only an unscoped first-time search resolves vehicle shape and
            // fans out; scoped searches are the fan-out legs themselves, and
            // repeat searches already covered every segment in one batch.
            (SearchScope::AllSegments, AttemptMode::First) => {
                self.resolve_shape(entity, found).await
            }
            _ => Ok(SearchHit {
                found,
                missing: Vec::new(),
                veh_cfg: None,
            }),
        }
    }

    /// Walk the first-time window ladder until data appears.
    ///
    /// A transport failure restarts the ladder once; a second failure
    /// terminates the chain.
    async fn run_ladder(
        &self,
        entity: &EntityId,
        segments: &[Segment],
    ) -> Result<HashMap<Segment, ComponentSensorSet>, SearchError> {
        let ladder = &self.settings.first_time_window_days;
        let mut transport_retried = false;
        let mut attempt = 0;

        while attempt < ladder.len() {
            let days = ladder[attempt];
            let to = now_unix();
            let from = to - i64::from(days) * SECS_PER_DAY;
            let queries = build_queries(self.catalog, entity, segments, from, to);
            if queries.is_empty() {
                warn!(entity = %entity, ?segments, "no catalog channels for requested segments");
                return Err(SearchError::NotFound { transport: false });
            }

            debug!(
                entity = %entity,
                window_days = days,
                attempt,
                queries = queries.len(),
                "first-time search attempt"
            );

            match self.client.batch_query(&queries).await {
                Err(e) => {
                    if transport_retried {
                        warn!(entity = %entity, error = %e, "second transport failure; giving up");
                        return Err(SearchError::NotFound { transport: true });
                    }
                    warn!(entity = %entity, error = %e, "transport failure; restarting ladder once");
                    transport_retried = true;
                    attempt = 0;
                }
                Ok(batches) => {
                    let sets = classify(&batches, from, to, entity, self.catalog);
                    if sets.is_empty() {
                        attempt += 1;
                    } else {
                        return Ok(sets);
                    }
                }
            }
        }

        debug!(entity = %entity, "window ladder exhausted without data");
        Err(SearchError::NotFound { transport: false })
    }

    /// Single short-window refresh attempt. Empty results and transport
    /// failures terminate identically; the flag tells them apart.
    async fn run_repeat(
        &self,
        entity: &EntityId,
        segments: &[Segment],
    ) -> Result<HashMap<Segment, ComponentSensorSet>, SearchError> {
        let to = now_unix();
        let from = to - self.settings.repeat_window_secs;
        let queries = build_queries(self.catalog, entity, segments, from, to);
        if queries.is_empty() {
            return Err(SearchError::NotFound { transport: false });
        }

        debug!(entity = %entity, window_secs = self.settings.repeat_window_secs, "repeat search");

        match self.client.batch_query(&queries).await {
            Err(e) => {
                warn!(entity = %entity, error = %e, "transport failure on repeat search");
                Err(SearchError::NotFound { transport: true })
            }
            Ok(batches) => {
                let sets = classify(&batches, from, to, entity, self.catalog);
                if sets.is_empty() {
                    Err(SearchError::NotFound { transport: false })
                } else {
                    Ok(sets)
                }
            }
        }
    }

    /// Decide single- vs multi-segment shape and fan out for missing
    /// segments.
    async fn resolve_shape(
        &self,
        entity: &EntityId,
        mut found: HashMap<Segment, ComponentSensorSet>,
    ) -> Result<SearchHit, SearchError> {
        let priority = &self.settings.segment_priority;

        // A vehicle whose only data sits under the top-priority segment is a
        // plain single-segment entity; no fan-out.
        if found.len() == 1 {
            let only = found.keys().next().cloned();
            if only.as_ref() == priority.first() {
                return Ok(SearchHit {
                    found,
                    missing: Vec::new(),
                    veh_cfg: None,
                });
            }
        }

        let active = priority
            .iter()
            .find(|segment| found.contains_key(*segment))
            .or_else(|| {
                // Data under a segment outside the configured priority list.
                found.keys().next()
            })
            .cloned()
            .ok_or(SearchError::NotFound { transport: false })?;

        let to_fetch: Vec<Segment> = priority
            .iter()
            .filter(|segment| !found.contains_key(*segment))
            .cloned()
            .collect();

        info!(
            entity = %entity,
            active = %active,
            observed = found.len(),
            fan_out = to_fetch.len(),
            "multi-segment vehicle detected"
        );

        let mut missing = Vec::new();
        let fanned = join_all(to_fetch.iter().map(|segment| {
            let segment = segment.clone();
            async move {
                let result = self
                    .run_ladder(entity, std::slice::from_ref(&segment))
                    .await;
                (segment, result)
            }
        }))
        .await;

        for (segment, result) in fanned {
            match result {
                Ok(sets) => {
                    for (seg, set) in sets {
                        found.insert(seg, set);
                    }
                }
                Err(SearchError::NotFound { transport }) => {
                    debug!(entity = %entity, segment = %segment, transport, "fan-out search found nothing");
                    missing.push(segment);
                }
            }
        }

        let mut segments_found: Vec<Segment> = priority
            .iter()
            .filter(|segment| found.contains_key(*segment))
            .cloned()
            .collect();
        for segment in found.keys() {
            if !segments_found.contains(segment) {
                segments_found.push(segment.clone());
            }
        }

        let total = found.len() + missing.len();
        Ok(SearchHit {
            found,
            missing,
            veh_cfg: Some(VehicleConfig {
                segments_found,
                total,
                active,
            }),
        })
    }
}
