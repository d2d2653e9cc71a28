//! Lazily built channel catalog with cross-context build coordination.
//!
//! The catalog maps every known sensor-location channel name to its remote
//! id, unit, and owning segment. Building it costs one resolution query per
//! channel name, so the result is persisted (versioned, with an expiry
//! horizon) in the shared key-value store and guarded by an advisory lock so
//! concurrent contexts sharing the store never build it twice.
//!
//! Build order on `ensure_loaded`:
//! 1. in-process memoized copy;
//! 2. persisted copy, if version and expiry check out;
//! 3. if another context holds the advisory lock: poll at a fixed interval,
//!    re-checking the persisted copy each round;
//! 4. take the lock, resolve every known channel name in one batch call,
//!    persist, release.

mod locations;
mod lock;
mod persist;
mod table;

pub use locations::{channel_name, known_channels, ChannelSpec, SEGMENTS};
pub use persist::{CATALOG_KEY, CATALOG_VERSION};
pub use table::{CatalogTable, ChannelEntry};

use crate::config::EngineSettings;
use crate::query::{QueryClient, QueryError};
use crate::store::{KvStore, StoreError};
use crate::time::now_unix;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Catalog construction and lookup failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The build produced no usable entries; the catalog stays unusable
    /// until a later attempt succeeds.
    #[error("channel catalog unavailable")]
    Unavailable,

    /// The persisted store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The resolution query failed.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// The catalog facade: memoizes the table in-process and coordinates builds
/// through the persisted store.
pub struct ChannelCatalog<S: KvStore> {
    store: Arc<S>,
    settings: Arc<EngineSettings>,
    holder: String,
    loaded: Mutex<Option<Arc<CatalogTable>>>,
}

impl<S: KvStore> ChannelCatalog<S> {
    /// Create a catalog over the given store.
    pub fn new(store: Arc<S>, settings: Arc<EngineSettings>) -> Self {
        Self {
            store,
            settings,
            holder: format!("pid-{}", std::process::id()),
            loaded: Mutex::new(None),
        }
    }

    /// Return the loaded catalog table, building it if necessary.
    ///
    /// Holding the internal mutex across the build serializes in-process
    /// callers; cross-context callers are coordinated by the advisory lock
    /// in the shared store.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Unavailable`] when the resolution call returned no
    /// usable channels; store and transport errors pass through.
    pub async fn ensure_loaded<C: QueryClient>(
        &self,
        client: &C,
    ) -> Result<Arc<CatalogTable>, CatalogError> {
        let mut loaded = self.loaded.lock().await;
        if let Some(table) = loaded.as_ref() {
            return Ok(table.clone());
        }

        if let Some(table) = self.load_persisted()? {
            debug!(channels = table.len(), "catalog loaded from persisted copy");
            let table = Arc::new(table);
            *loaded = Some(table.clone());
            return Ok(table);
        }

        if let Some(flag) = lock::read(self.store.as_ref())? {
            debug!(
                holder = %flag.holder,
                "catalog build lock held; polling for a persisted copy"
            );
            for _ in 0..self.settings.lock_poll_attempts {
                sleep(self.settings.lock_poll_interval).await;
                if let Some(table) = self.load_persisted()? {
                    debug!(
                        channels = table.len(),
                        "catalog appeared while waiting on concurrent builder"
                    );
                    let table = Arc::new(table);
                    *loaded = Some(table.clone());
                    return Ok(table);
                }
            }
            warn!(
                holder = %flag.holder,
                acquired_at = flag.acquired_at,
                "concurrent catalog build never completed; taking the lock over"
            );
        }

        lock::acquire(self.store.as_ref(), &self.holder, now_unix())?;
        let table = self.build(client).await?;
        lock::release(self.store.as_ref())?;

        let table = Arc::new(table);
        *loaded = Some(table.clone());
        Ok(table)
    }

    fn load_persisted(&self) -> Result<Option<CatalogTable>, StoreError> {
        let Some(persisted) = persist::load(self.store.as_ref())? else {
            return Ok(None);
        };
        if !persisted.is_valid(now_unix(), self.settings.catalog_expiry) {
            debug!(
                version = persisted.version,
                built_at = persisted.built_at,
                "persisted catalog expired or version-mismatched"
            );
            return Ok(None);
        }
        Ok(Some(CatalogTable::from_entries(persisted.entries)))
    }

    /// Resolve every known channel name in one batch call and persist the
    /// result.
    ///
    /// An empty resolution leaves the advisory lock in place for a later
    /// attempt, matching the caller's release-on-success-only flow.
    async fn build<C: QueryClient>(&self, client: &C) -> Result<CatalogTable, CatalogError> {
        let specs = known_channels();
        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let infos = client.resolve_channels(&names).await?;

        let mut entries = Vec::with_capacity(specs.len());
        for (spec, info) in specs.into_iter().zip(infos) {
            match info {
                Some(info) => entries.push(ChannelEntry {
                    name: spec.name,
                    remote_id: info.remote_id,
                    unit: info.unit,
                    segment: spec.segment,
                    category: spec.category,
                    location: spec.location,
                }),
                None => debug!(channel = %spec.name, "channel unknown to query service"),
            }
        }

        if entries.is_empty() {
            warn!("channel resolution returned no entries; catalog unavailable");
            return Err(CatalogError::Unavailable);
        }

        let persisted = persist::PersistedCatalog::new(entries, now_unix());
        persist::save(self.store.as_ref(), &persisted)?;
        info!(channels = persisted.entries.len(), "channel catalog built");
        Ok(CatalogTable::from_entries(persisted.entries))
    }
}
