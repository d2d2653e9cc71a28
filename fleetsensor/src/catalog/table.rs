//! Resolved channel catalog with bidirectional indexing.

use crate::query::ChannelId;
use crate::reading::{LocationKey, Segment, SensorCategory};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One resolved catalog row. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Human-readable channel name, e.g. `trailer1.tire-pressure.axle2-left`.
    pub name: String,
    /// Remote channel identifier.
    pub remote_id: ChannelId,
    /// Native unit reported by the service (e.g. "celsius", "kilopascal").
    pub unit: String,
    /// Owning vehicle segment.
    pub segment: Segment,
    /// Channel category.
    pub category: SensorCategory,
    /// Sensor location within the `(segment, category)` pair.
    pub location: LocationKey,
}

/// The resolved catalog, indexed by channel name and by remote id.
#[derive(Debug, Clone, Default)]
pub struct CatalogTable {
    entries: Vec<ChannelEntry>,
    by_name: HashMap<String, usize>,
    by_remote_id: HashMap<ChannelId, usize>,
}

impl CatalogTable {
    /// Build the table and its bidirectional index from resolved rows.
    pub fn from_entries(entries: Vec<ChannelEntry>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_remote_id = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_name.insert(entry.name.clone(), idx);
            by_remote_id.insert(entry.remote_id, idx);
        }
        Self {
            entries,
            by_name,
            by_remote_id,
        }
    }

    /// Look up a channel by name.
    pub fn by_name(&self, name: &str) -> Option<&ChannelEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Look up a channel by remote id.
    pub fn by_remote_id(&self, id: ChannelId) -> Option<&ChannelEntry> {
        self.by_remote_id.get(&id).map(|&idx| &self.entries[idx])
    }

    /// All channels under one segment.
    pub fn segment_channels<'a>(
        &'a self,
        segment: &'a Segment,
    ) -> impl Iterator<Item = &'a ChannelEntry> {
        self.entries.iter().filter(move |e| &e.segment == segment)
    }

    /// All resolved rows.
    pub fn entries(&self) -> &[ChannelEntry] {
        &self.entries
    }

    /// Number of resolved channels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog resolved nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
