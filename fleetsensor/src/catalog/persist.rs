//! Versioned persistence of the channel catalog in the key-value store.

use super::table::ChannelEntry;
use crate::store::{KvStore, StoreError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Store key holding the serialized catalog.
pub const CATALOG_KEY: &str = "fleetsensor.catalog";

/// Bumped whenever the catalog schema or the known-channel tables change;
/// a persisted copy with a different version is rebuilt.
pub const CATALOG_VERSION: u32 = 2;

/// Serialized form of the catalog.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedCatalog {
    pub version: u32,
    /// Build time, unix seconds.
    pub built_at: i64,
    pub entries: Vec<ChannelEntry>,
}

impl PersistedCatalog {
    /// Wrap freshly resolved entries for persistence.
    pub fn new(entries: Vec<ChannelEntry>, built_at: i64) -> Self {
        Self {
            version: CATALOG_VERSION,
            built_at,
            entries,
        }
    }

    /// Whether this copy is usable: version matches and the expiry horizon
    /// has not passed.
    pub fn is_valid(&self, now: i64, expiry: Duration) -> bool {
        self.version == CATALOG_VERSION
            && !self.entries.is_empty()
            && now - self.built_at < expiry.as_secs() as i64
    }
}

/// Load the persisted catalog, if present and decodable.
///
/// A corrupt or undecodable copy is treated as absent (warn-logged); the
/// caller will rebuild and overwrite it.
pub fn load<S: KvStore>(store: &S) -> Result<Option<PersistedCatalog>, StoreError> {
    let Some(text) = store.get(CATALOG_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str::<PersistedCatalog>(&text) {
        Ok(catalog) => Ok(Some(catalog)),
        Err(e) => {
            warn!(error = %e, "discarding undecodable persisted catalog");
            Ok(None)
        }
    }
}

/// Persist the catalog.
pub fn save<S: KvStore>(store: &S, catalog: &PersistedCatalog) -> Result<(), StoreError> {
    let text = serde_json::to_string(catalog)
        .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?;
    store.set(CATALOG_KEY, &text)?;
    debug!(
        entries = catalog.entries.len(),
        version = catalog.version,
        "persisted channel catalog"
    );
    Ok(())
}
