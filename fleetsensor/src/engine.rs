//! Engine facade: the public API over catalog, search, and cache.
//!
//! One [`TelemetryEngine`] instance per process/session owns its cache and
//! channel catalog; consumers hold a reference instead of reaching for
//! ambient state. Unrelated entities fetch fully in parallel; per-entity
//! mutation is serialized by the cache's single-flight flag.

use crate::cache::{BeginFetch, SensorCache, SensorData};
use crate::catalog::{CatalogError, ChannelCatalog};
use crate::config::{EngineSettings, MIN_LIFETIME_SECS};
use crate::error::FetchError;
use crate::query::QueryClient;
use crate::reading::EntityId;
use crate::search::{AttemptMode, SearchError, SearchProtocol, SearchScope};
use crate::store::KvStore;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Successful fetch resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchOutcome {
    /// Nothing new to report: cache still fresh, or a refresh attempt came
    /// back empty (soft failure). Consumers treat both identically.
    NothingNew,
    /// A snapshot of the merged sensor data.
    Data(SensorData),
}

/// The telemetry acquisition engine.
pub struct TelemetryEngine<C: QueryClient, S: KvStore> {
    client: C,
    catalog: ChannelCatalog<S>,
    cache: SensorCache,
    settings: Arc<EngineSettings>,
    lifetime_secs: AtomicU64,
}

impl<C: QueryClient, S: KvStore> TelemetryEngine<C, S> {
    /// Build an engine over a query client and a shared key-value store.
    pub fn new(client: C, store: S, settings: EngineSettings) -> Self {
        let settings = Arc::new(settings);
        let lifetime_secs = AtomicU64::new(settings.lifetime_secs.max(MIN_LIFETIME_SECS));
        Self {
            client,
            catalog: ChannelCatalog::new(Arc::new(store), settings.clone()),
            cache: SensorCache::new(),
            settings,
            lifetime_secs,
        }
    }

    /// Fetch (or refresh) cached sensor data for an entity.
    ///
    /// Resolves with [`FetchOutcome::Data`] when a search merged anything
    /// (or the release-stale override was armed), and
    /// [`FetchOutcome::NothingNew`] when the cache is fresh or a refresh
    /// attempt found nothing — routine outcomes consumers need not
    /// special-case.
    ///
    /// # Errors
    ///
    /// [`FetchError::Busy`] while a search for the same entity is in
    /// flight (no remote call is issued); [`FetchError::NotFound`] when the
    /// first-time retry budget is exhausted and the entity has never
    /// produced data.
    pub async fn fetch_cached_sensor_data(
        &self,
        entity: &EntityId,
        display_name: &str,
    ) -> Result<FetchOutcome, FetchError> {
        match self.cache.begin_fetch(entity) {
            BeginFetch::Busy => {
                debug!(entity = %entity, display_name, "fetch rejected: search in flight");
                Err(FetchError::Busy {
                    message: self.settings.busy_message.clone(),
                })
            }
            BeginFetch::Fresh { armed_snapshot } => match armed_snapshot {
                Some(data) => Ok(FetchOutcome::Data(data)),
                None => Ok(FetchOutcome::NothingNew),
            },
            BeginFetch::Search { mode } => self.run_search(entity, display_name, mode).await,
        }
    }

    async fn run_search(
        &self,
        entity: &EntityId,
        display_name: &str,
        mode: AttemptMode,
    ) -> Result<FetchOutcome, FetchError> {
        let lifetime = self.lifetime();

        let result = match self.catalog.ensure_loaded(&self.client).await {
            Err(e) => {
                warn!(entity = %entity, error = %e, "catalog unavailable; search aborted");
                Err(SearchError::NotFound {
                    transport: matches!(e, CatalogError::Query(_)),
                })
            }
            Ok(catalog) => {
                let protocol = SearchProtocol::new(&self.client, &catalog, &self.settings);
                protocol
                    .search(entity, SearchScope::AllSegments, mode)
                    .await
            }
        };

        match result {
            Ok(hit) => {
                let (snapshot, changed) =
                    self.cache
                        .complete_hit(entity, hit, &self.settings, lifetime);
                info!(
                    entity = %entity,
                    display_name,
                    changed,
                    "sensor data fetch completed"
                );
                match snapshot {
                    Some(data) => Ok(FetchOutcome::Data(data)),
                    None => Ok(FetchOutcome::NothingNew),
                }
            }
            Err(SearchError::NotFound { transport }) => {
                let miss = self.cache.complete_miss(entity, transport, lifetime);
                if let Some(stale) = miss.stale_snapshot {
                    debug!(entity = %entity, "returning stale data under release-stale override");
                    return Ok(FetchOutcome::Data(stale));
                }
                if miss.first_time {
                    Err(FetchError::NotFound {
                        message: self.settings.not_found_message.clone(),
                    })
                } else {
                    Ok(FetchOutcome::NothingNew)
                }
            }
        }
    }

    /// Force the next fetch for `entity` to return whatever cached data
    /// exists, fresh or not, even if the underlying attempt fails.
    pub fn release_stale_cached_sensor_data_on_next_fetch(&self, entity: &EntityId) {
        self.cache.arm_release_stale(entity);
    }

    /// Remove one entity's cache entry, or all entries.
    ///
    /// Entries mid-search are drained via bounded polling first; an entry
    /// still busy after the budget is left in place.
    pub async fn reset_cache(&self, entity: Option<&EntityId>) {
        self.cache
            .reset(
                entity,
                self.settings.lock_poll_interval,
                self.settings.lock_poll_attempts,
            )
            .await;
    }

    /// Warm the channel catalog, returning the number of resolved channels.
    pub async fn ensure_catalog(&self) -> Result<usize, CatalogError> {
        let table = self.catalog.ensure_loaded(&self.client).await?;
        Ok(table.len())
    }

    /// Current cache lifetime in seconds.
    pub fn sensor_data_lifetime_secs(&self) -> u64 {
        self.lifetime_secs.load(Ordering::Relaxed)
    }

    /// Replace the cache lifetime; values below the minimum are clamped.
    pub fn set_sensor_data_lifetime_secs(&self, secs: u64) {
        self.lifetime_secs
            .store(secs.max(MIN_LIFETIME_SECS), Ordering::Relaxed);
    }

    /// The underlying per-entity cache.
    pub fn cache(&self) -> &SensorCache {
        &self.cache
    }

    /// The underlying query client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Engine configuration.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn lifetime(&self) -> Duration {
        Duration::from_secs(self.sensor_data_lifetime_secs())
    }
}
