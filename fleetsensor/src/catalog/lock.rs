//! Advisory cross-context lock for catalog builds.
//!
//! The lock is a plain shared flag with a timestamp in the key-value store,
//! not a true mutex: independent execution contexts sharing the store use it
//! to avoid rebuilding the (expensive) catalog concurrently. Within one
//! process the catalog's own mutex serializes builders; this flag only
//! coordinates across processes.

use crate::store::{KvStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Store key holding the lock flag.
pub const LOCK_KEY: &str = "fleetsensor.catalog.lock";

/// The lock flag: who took it and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryLock {
    /// Opaque identity of the holding context.
    pub holder: String,
    /// Acquisition time, unix seconds.
    pub acquired_at: i64,
}

/// Read the current lock flag, if set.
///
/// An undecodable flag is treated as held by an unknown context; the normal
/// polling/takeover path clears it.
pub fn read<S: KvStore>(store: &S) -> Result<Option<AdvisoryLock>, StoreError> {
    let Some(text) = store.get(LOCK_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str(&text) {
        Ok(lock) => Ok(Some(lock)),
        Err(e) => {
            warn!(error = %e, "undecodable catalog lock flag");
            Ok(Some(AdvisoryLock {
                holder: "<unknown>".to_string(),
                acquired_at: 0,
            }))
        }
    }
}

/// Set the lock flag, replacing any previous holder.
pub fn acquire<S: KvStore>(store: &S, holder: &str, now: i64) -> Result<(), StoreError> {
    let lock = AdvisoryLock {
        holder: holder.to_string(),
        acquired_at: now,
    };
    let text = serde_json::to_string(&lock)
        .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?;
    store.set(LOCK_KEY, &text)
}

/// Clear the lock flag.
pub fn release<S: KvStore>(store: &S) -> Result<(), StoreError> {
    store.remove(LOCK_KEY)
}
