//! Classification of raw batch-query records into typed readings.
//!
//! Malformed records are discarded silently (debug-level trace only); they
//! are routine in the feed and never surfaced to consumers. Within a
//! category, only the most recent record per location survives; exact-time
//! ties keep the first record seen.

use crate::catalog::CatalogTable;
use crate::query::RawRecord;
use crate::reading::types::{ComponentSensorSet, EntityId, Freshness, Reading, Segment};
use crate::reading::units;
use crate::reading::SensorCategory;
use std::collections::HashMap;
use tracing::trace;

/// Classify raw records into per-segment sensor sets.
///
/// # Arguments
///
/// * `batches` - Record lists as returned by the batch query
/// * `from` / `to` - Search window; records at or outside either bound are
///   discarded (exclusive on both ends)
/// * `entity` - Expected entity; mismatched records are discarded
/// * `catalog` - Loaded channel catalog for id-to-channel mapping
pub fn classify(
    batches: &[Vec<RawRecord>],
    from: i64,
    to: i64,
    entity: &EntityId,
    catalog: &CatalogTable,
) -> HashMap<Segment, ComponentSensorSet> {
    let mut out: HashMap<Segment, ComponentSensorSet> = HashMap::new();

    for record in batches.iter().flatten() {
        if record.id.is_empty() || record.time <= 0 {
            trace!(channel = %record.channel_id, "discarding record without id or timestamp");
            continue;
        }
        if record.entity_id != entity.as_str() {
            trace!(
                got = %record.entity_id,
                expected = %entity,
                "discarding record for foreign entity"
            );
            continue;
        }
        if record.time <= from || record.time >= to {
            trace!(time = record.time, from, to, "discarding record outside window");
            continue;
        }
        let Some(channel) = catalog.by_remote_id(record.channel_id) else {
            trace!(channel = %record.channel_id, "discarding record for unknown channel");
            continue;
        };

        let set = out.entry(channel.segment.clone()).or_default();
        if let Some(existing) = set.get(channel.category, &channel.location) {
            // Most recent wins; exact ties keep the first seen.
            if existing.time >= record.time {
                continue;
            }
        }

        let value = match channel.category {
            SensorCategory::Temperature | SensorCategory::TireTemperature => {
                units::temperature_from_celsius(record.data)
            }
            SensorCategory::TirePressure => units::pressure_from_kilopascals(record.data),
        };

        set.insert(Reading {
            location: channel.location.clone(),
            category: channel.category,
            time: record.time,
            segment: channel.segment.clone(),
            value,
            freshness: Freshness::Fresh,
        });
    }

    out.retain(|_, set| !set.is_empty());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChannelEntry;
    use crate::query::ChannelId;
    use crate::reading::{LocationKey, SensorValue};

    fn test_catalog() -> CatalogTable {
        CatalogTable::from_entries(vec![
            ChannelEntry {
                name: "tractor.tire-pressure.axle1-left".to_string(),
                remote_id: ChannelId(1),
                unit: "kilopascal".to_string(),
                segment: Segment::new("tractor"),
                category: SensorCategory::TirePressure,
                location: LocationKey::new("axle1-left"),
            },
            ChannelEntry {
                name: "trailer1.temp.zone1".to_string(),
                remote_id: ChannelId(2),
                unit: "celsius".to_string(),
                segment: Segment::new("trailer1"),
                category: SensorCategory::Temperature,
                location: LocationKey::new("zone1"),
            },
        ])
    }

    fn record(id: &str, time: i64, channel: u64, data: f64) -> RawRecord {
        RawRecord {
            id: id.to_string(),
            time,
            entity_id: "veh-1".to_string(),
            channel_id: ChannelId(channel),
            data,
        }
    }

    fn entity() -> EntityId {
        EntityId::new("veh-1")
    }

    #[test]
    fn classifies_by_segment_and_category() {
        let catalog = test_catalog();
        let batches = vec![vec![
            record("a", 150, 1, 827.4),
            record("b", 160, 2, 4.0),
        ]];
        let sets = classify(&batches, 100, 200, &entity(), &catalog);

        assert_eq!(sets.len(), 2);
        let tractor = &sets[&Segment::new("tractor")];
        let tire = tractor
            .get(SensorCategory::TirePressure, &LocationKey::new("axle1-left"))
            .unwrap();
        assert_eq!(tire.time, 150);
        assert!(matches!(tire.value, SensorValue::Pressure { .. }));

        let trailer = &sets[&Segment::new("trailer1")];
        let zone = trailer
            .get(SensorCategory::Temperature, &LocationKey::new("zone1"))
            .unwrap();
        assert_eq!(
            zone.value,
            SensorValue::Temperature {
                celsius: 4.0,
                fahrenheit: 39.2,
            }
        );
    }

    #[test]
    fn discards_malformed_records() {
        let catalog = test_catalog();
        let mut foreign = record("d", 150, 1, 1.0);
        foreign.entity_id = "veh-2".to_string();
        let batches = vec![vec![
            record("", 150, 1, 1.0),   // missing id
            record("b", 0, 1, 1.0),    // missing timestamp
            record("c", 150, 99, 1.0), // unknown channel
            foreign,                   // entity mismatch
        ]];
        let sets = classify(&batches, 100, 200, &entity(), &catalog);
        assert!(sets.is_empty());
    }

    #[test]
    fn window_is_exclusive_on_both_ends() {
        let catalog = test_catalog();
        let batches = vec![vec![
            record("a", 100, 1, 1.0), // at from: discarded
            record("b", 200, 1, 1.0), // at to: discarded
            record("c", 101, 1, 1.0),
        ]];
        let sets = classify(&batches, 100, 200, &entity(), &catalog);
        let tractor = &sets[&Segment::new("tractor")];
        assert_eq!(tractor.len(), 1);
        let tire = tractor
            .get(SensorCategory::TirePressure, &LocationKey::new("axle1-left"))
            .unwrap();
        assert_eq!(tire.time, 101);
    }

    #[test]
    fn most_recent_record_wins_per_location() {
        let catalog = test_catalog();
        let batches = vec![vec![
            record("a", 150, 1, 700.0),
            record("b", 180, 1, 800.0),
            record("c", 120, 1, 600.0),
        ]];
        let sets = classify(&batches, 100, 200, &entity(), &catalog);
        let tire = sets[&Segment::new("tractor")]
            .get(SensorCategory::TirePressure, &LocationKey::new("axle1-left"))
            .unwrap();
        assert_eq!(tire.time, 180);
        assert_eq!(tire.value.native(), 800.0);
    }

    #[test]
    fn exact_time_tie_keeps_first_seen() {
        let catalog = test_catalog();
        let batches = vec![vec![
            record("first", 150, 1, 700.0),
            record("second", 150, 1, 999.0),
        ]];
        let sets = classify(&batches, 100, 200, &entity(), &catalog);
        let tire = sets[&Segment::new("tractor")]
            .get(SensorCategory::TirePressure, &LocationKey::new("axle1-left"))
            .unwrap();
        assert_eq!(tire.value.native(), 700.0);
    }
}
