//! Query planning: catalog channels to batch queries.

use super::types::ChannelQuery;
use crate::catalog::CatalogTable;
use crate::reading::{EntityId, Segment};

/// Build the batch of channel queries for the requested segments, each
/// scoped to `[from, to)`.
///
/// Pure function: one query per known channel under each requested segment,
/// in catalog order. Requires a loaded catalog; unknown segments simply
/// contribute no queries.
pub fn build_queries(
    catalog: &CatalogTable,
    entity: &EntityId,
    segments: &[Segment],
    from: i64,
    to: i64,
) -> Vec<ChannelQuery> {
    segments
        .iter()
        .flat_map(|segment| catalog.segment_channels(segment))
        .map(|channel| ChannelQuery {
            channel_id: channel.remote_id,
            entity_id: entity.clone(),
            from,
            to,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChannelEntry;
    use crate::query::ChannelId;
    use crate::reading::{LocationKey, SensorCategory};

    fn catalog() -> CatalogTable {
        let entry = |name: &str, id: u64, segment: &str| ChannelEntry {
            name: name.to_string(),
            remote_id: ChannelId(id),
            unit: "celsius".to_string(),
            segment: Segment::new(segment),
            category: SensorCategory::Temperature,
            location: LocationKey::new("zone1"),
        };
        CatalogTable::from_entries(vec![
            entry("a", 1, "tractor"),
            entry("b", 2, "trailer1"),
            entry("c", 3, "trailer1"),
        ])
    }

    #[test]
    fn one_query_per_channel_per_requested_segment() {
        let catalog = catalog();
        let entity = EntityId::new("veh-1");
        let queries = build_queries(
            &catalog,
            &entity,
            &[Segment::new("trailer1")],
            1_000,
            2_000,
        );
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| q.from == 1_000 && q.to == 2_000));
        assert!(queries.iter().all(|q| q.entity_id == entity));
        assert!(queries.iter().any(|q| q.channel_id == ChannelId(2)));
        assert!(queries.iter().any(|q| q.channel_id == ChannelId(3)));
    }

    #[test]
    fn unknown_segment_contributes_nothing() {
        let catalog = catalog();
        let queries = build_queries(
            &catalog,
            &EntityId::new("veh-1"),
            &[Segment::new("dolly")],
            0,
            10,
        );
        assert!(queries.is_empty());
    }

    #[test]
    fn multiple_segments_concatenate() {
        let catalog = catalog();
        let queries = build_queries(
            &catalog,
            &EntityId::new("veh-1"),
            &[Segment::new("tractor"), Segment::new("trailer1")],
            0,
            10,
        );
        assert_eq!(queries.len(), 3);
    }
}
