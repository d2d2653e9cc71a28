//! Location-keyed merge of freshly fetched data into the cache.
//!
//! Merging is two-phase: first every location already cached is aged one
//! freshness step, then fresh locations are inserted or overwritten and
//! marked `Fresh`. The order guarantees a location updated in pass N is
//! still flagged (`PendingClear`) for one more render cycle in pass N+1
//! before settling to `Stale`. A location whose `(key, time)` pair is
//! unchanged is left untouched, which makes merge commutative with respect
//! to arrival order of racing fetches.

use super::entry::SensorData;
use crate::config::EngineSettings;
use crate::reading::{ComponentSensorSet, Freshness, Segment, VehicleConfig};
use crate::search::SearchHit;
use std::collections::HashMap;
use tracing::debug;

/// Merge one segment's fresh set into its cached counterpart.
///
/// Returns the number of inserted or replaced locations.
pub fn merge_component_set(cached: &mut ComponentSensorSet, fresh: ComponentSensorSet) -> usize {
    cached.age_all();

    let mut changed = 0;
    for mut reading in fresh.drain() {
        if let Some(existing) = cached.get(reading.category, &reading.location) {
            if existing.time == reading.time {
                continue;
            }
        }
        reading.freshness = Freshness::Fresh;
        cached.insert(reading);
        changed += 1;
    }
    changed
}

/// Fold a search hit into the cached data, upgrading the shape from single
/// to multi when the hit reveals additional segments.
///
/// Returns the number of changed locations across all segments.
pub fn merge_hit(
    data: &mut Option<SensorData>,
    hit: SearchHit,
    settings: &EngineSettings,
) -> usize {
    // Stay in the flat single shape when both sides agree on one segment.
    let single_compatible = hit.veh_cfg.is_none() && hit.missing.is_empty() && hit.found.len() == 1;
    if single_compatible {
        let (hit_segment, fresh) = match hit.found.into_iter().next() {
            Some(pair) => pair,
            None => return 0,
        };

        let merge_in_place = match data.as_ref() {
            None => true,
            Some(SensorData::Single(cached)) => {
                let cached_segment = SensorData::single_segment(cached);
                cached_segment.is_none() || cached_segment == Some(hit_segment.clone())
            }
            Some(SensorData::Multi { .. }) => false,
        };

        if merge_in_place {
            if data.is_none() {
                *data = Some(SensorData::Single(ComponentSensorSet::new()));
            }
            if let Some(SensorData::Single(cached)) = data.as_mut() {
                return merge_component_set(cached, fresh);
            }
        }

        // A new segment appeared (or the cache is already multi-shaped);
        // fold the single hit through the multi path.
        let mut found = HashMap::new();
        found.insert(hit_segment, fresh);
        return upgrade_and_merge(data, found, Vec::new(), None, settings);
    }

    upgrade_and_merge(data, hit.found, hit.missing, hit.veh_cfg, settings)
}

fn upgrade_and_merge(
    data: &mut Option<SensorData>,
    found: HashMap<Segment, ComponentSensorSet>,
    missing: Vec<Segment>,
    veh_cfg: Option<VehicleConfig>,
    settings: &EngineSettings,
) -> usize {
    let (mut segments, stored_cfg): (HashMap<Segment, Option<ComponentSensorSet>>, _) =
        match data.take() {
            None => (HashMap::new(), None),
            Some(SensorData::Single(set)) => match SensorData::single_segment(&set) {
                Some(segment) => (HashMap::from([(segment, Some(set))]), None),
                None => (HashMap::new(), None),
            },
            Some(SensorData::Multi { segments, veh_cfg }) => (segments, Some(veh_cfg)),
        };

    let mut changed = 0;
    for (segment, fresh) in found {
        let slot = segments.entry(segment).or_insert(None);
        let cached = slot.get_or_insert_with(ComponentSensorSet::new);
        changed += merge_component_set(cached, fresh);
    }
    // Record failed fan-out segments as absent without clobbering data a
    // previous pass did fetch.
    for segment in missing {
        segments.entry(segment).or_insert(None);
    }

    // The config is decided once, when the shape is resolved. A repeat hit
    // carries no config and must not re-elect the active segment; only the
    // segment bookkeeping is refreshed.
    let veh_cfg = match (veh_cfg, stored_cfg) {
        (Some(cfg), _) => cfg,
        (None, Some(mut cfg)) => {
            cfg.segments_found = segments_with_data(&segments, settings);
            cfg.total = segments.len();
            cfg
        }
        (None, None) => derive_config(&segments, settings),
    };
    debug!(
        segments = segments.len(),
        active = %veh_cfg.active,
        changed,
        "merged multi-segment sensor data"
    );
    *data = Some(SensorData::Multi { segments, veh_cfg });
    changed
}

/// Build a vehicle config from the merged per-segment map, used when a
/// config-less hit grows a single-shaped cache into multi.
fn derive_config(
    segments: &HashMap<Segment, Option<ComponentSensorSet>>,
    settings: &EngineSettings,
) -> VehicleConfig {
    let segments_found = segments_with_data(segments, settings);
    let active = segments_found
        .first()
        .cloned()
        .unwrap_or_else(|| Segment::new("unknown"));
    VehicleConfig {
        total: segments.len(),
        segments_found,
        active,
    }
}

/// Segments that currently hold data, configured-priority entries first.
fn segments_with_data(
    segments: &HashMap<Segment, Option<ComponentSensorSet>>,
    settings: &EngineSettings,
) -> Vec<Segment> {
    let mut found: Vec<Segment> = settings
        .segment_priority
        .iter()
        .filter(|segment| matches!(segments.get(*segment), Some(Some(_))))
        .cloned()
        .collect();
    for (segment, set) in segments {
        if set.is_some() && !found.contains(segment) {
            found.push(segment.clone());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{temperature_from_celsius, LocationKey, Reading, SensorCategory};

    fn reading(location: &str, time: i64, celsius: f64) -> Reading {
        Reading {
            location: LocationKey::new(location),
            category: SensorCategory::Temperature,
            time,
            segment: Segment::new("tractor"),
            value: temperature_from_celsius(celsius),
            freshness: Freshness::Fresh,
        }
    }

    fn set_of(readings: Vec<Reading>) -> ComponentSensorSet {
        let mut set = ComponentSensorSet::new();
        for r in readings {
            set.insert(r);
        }
        set
    }

    fn freshness_of(set: &ComponentSensorSet, location: &str) -> Freshness {
        set.get(SensorCategory::Temperature, &LocationKey::new(location))
            .unwrap()
            .freshness
    }

    #[test]
    fn new_locations_are_inserted_fresh() {
        let mut cached = ComponentSensorSet::new();
        let changed = merge_component_set(&mut cached, set_of(vec![reading("cab", 100, 20.0)]));
        assert_eq!(changed, 1);
        assert_eq!(freshness_of(&cached, "cab"), Freshness::Fresh);
    }

    #[test]
    fn changed_time_replaces_and_marks_fresh() {
        let mut cached = ComponentSensorSet::new();
        merge_component_set(&mut cached, set_of(vec![reading("cab", 100, 20.0)]));
        let changed = merge_component_set(&mut cached, set_of(vec![reading("cab", 160, 22.0)]));
        assert_eq!(changed, 1);
        let r = cached
            .get(SensorCategory::Temperature, &LocationKey::new("cab"))
            .unwrap();
        assert_eq!(r.time, 160);
        assert_eq!(r.freshness, Freshness::Fresh);
    }

    #[test]
    fn identical_time_is_untouched_and_counts_no_change() {
        let mut cached = ComponentSensorSet::new();
        merge_component_set(&mut cached, set_of(vec![reading("cab", 100, 20.0)]));
        let changed = merge_component_set(&mut cached, set_of(vec![reading("cab", 100, 20.0)]));
        assert_eq!(changed, 0);
    }

    #[test]
    fn untouched_location_cycles_fresh_pending_stale() {
        let mut cached = ComponentSensorSet::new();
        merge_component_set(&mut cached, set_of(vec![reading("cab", 100, 20.0)]));
        assert_eq!(freshness_of(&cached, "cab"), Freshness::Fresh);

        // Two passes that update a different location.
        merge_component_set(&mut cached, set_of(vec![reading("engine-bay", 110, 60.0)]));
        assert_eq!(freshness_of(&cached, "cab"), Freshness::PendingClear);

        merge_component_set(&mut cached, set_of(vec![reading("engine-bay", 120, 61.0)]));
        assert_eq!(freshness_of(&cached, "cab"), Freshness::Stale);

        // Stale is absorbing.
        merge_component_set(&mut cached, set_of(vec![reading("engine-bay", 130, 62.0)]));
        assert_eq!(freshness_of(&cached, "cab"), Freshness::Stale);
    }

    fn hit_single(segment: &str, readings: Vec<Reading>) -> SearchHit {
        let mut found = HashMap::new();
        let mut set = ComponentSensorSet::new();
        for mut r in readings {
            r.segment = Segment::new(segment);
            set.insert(r);
        }
        found.insert(Segment::new(segment), set);
        SearchHit {
            found,
            missing: Vec::new(),
            veh_cfg: None,
        }
    }

    #[test]
    fn single_hit_into_empty_cache_stays_single() {
        let settings = EngineSettings::default();
        let mut data = None;
        let changed = merge_hit(
            &mut data,
            hit_single("tractor", vec![reading("cab", 100, 20.0)]),
            &settings,
        );
        assert_eq!(changed, 1);
        assert!(matches!(data, Some(SensorData::Single(_))));
    }

    #[test]
    fn different_segment_upgrades_single_to_multi() {
        let settings = EngineSettings::default();
        let mut data = None;
        merge_hit(
            &mut data,
            hit_single("tractor", vec![reading("cab", 100, 20.0)]),
            &settings,
        );
        let changed = merge_hit(
            &mut data,
            hit_single("trailer1", vec![reading("zone1", 120, 4.0)]),
            &settings,
        );
        assert_eq!(changed, 1);
        match &data {
            Some(SensorData::Multi { segments, veh_cfg }) => {
                assert_eq!(segments.len(), 2);
                assert!(segments[&Segment::new("tractor")].is_some());
                assert!(segments[&Segment::new("trailer1")].is_some());
                assert_eq!(veh_cfg.active, Segment::new("tractor"));
                assert_eq!(veh_cfg.total, 2);
            }
            other => panic!("expected multi shape, got {other:?}"),
        }
    }

    #[test]
    fn repeat_merge_keeps_the_recorded_active_segment() {
        let settings = EngineSettings::default();

        // Shape resolved by the initial unscoped search: trailer1 active,
        // tractor recorded absent.
        let mut found = HashMap::new();
        let mut set = ComponentSensorSet::new();
        let mut r = reading("zone1", 100, 4.0);
        r.segment = Segment::new("trailer1");
        set.insert(r);
        found.insert(Segment::new("trailer1"), set);

        let mut data = None;
        merge_hit(
            &mut data,
            SearchHit {
                found,
                missing: vec![Segment::new("tractor")],
                veh_cfg: Some(VehicleConfig {
                    segments_found: vec![Segment::new("trailer1")],
                    total: 2,
                    active: Segment::new("trailer1"),
                }),
            },
            &settings,
        );

        // A later pass finds tractor data, then a config-less repeat hit
        // refreshes trailer1. Neither may re-elect the active segment.
        merge_hit(
            &mut data,
            hit_single("tractor", vec![reading("cab", 200, 21.0)]),
            &settings,
        );
        merge_hit(
            &mut data,
            hit_single("trailer1", vec![reading("zone1", 300, 5.0)]),
            &settings,
        );

        match &data {
            Some(SensorData::Multi { segments, veh_cfg }) => {
                assert_eq!(veh_cfg.active, Segment::new("trailer1"));
                assert_eq!(
                    veh_cfg.segments_found,
                    vec![Segment::new("tractor"), Segment::new("trailer1")]
                );
                assert_eq!(veh_cfg.total, 2);
                assert!(segments[&Segment::new("tractor")].is_some());
            }
            other => panic!("expected multi shape, got {other:?}"),
        }
    }

    #[test]
    fn missing_fan_out_segment_is_recorded_absent_but_never_clobbers() {
        let settings = EngineSettings::default();
        let mut found = HashMap::new();
        let mut set = ComponentSensorSet::new();
        let mut r = reading("zone1", 100, 4.0);
        r.segment = Segment::new("trailer1");
        set.insert(r);
        found.insert(Segment::new("trailer1"), set);

        let mut data = None;
        merge_hit(
            &mut data,
            SearchHit {
                found,
                missing: vec![Segment::new("tractor")],
                veh_cfg: Some(VehicleConfig {
                    segments_found: vec![Segment::new("trailer1")],
                    total: 2,
                    active: Segment::new("trailer1"),
                }),
            },
            &settings,
        );
        match &data {
            Some(SensorData::Multi { segments, .. }) => {
                assert!(segments[&Segment::new("tractor")].is_none());
            }
            other => panic!("expected multi shape, got {other:?}"),
        }

        // A later pass fetches tractor data; a subsequent miss must not
        // reset it to absent.
        merge_hit(
            &mut data,
            hit_single("tractor", vec![reading("cab", 200, 21.0)]),
            &settings,
        );
        let mut found = HashMap::new();
        let mut set = ComponentSensorSet::new();
        let mut r = reading("zone1", 300, 5.0);
        r.segment = Segment::new("trailer1");
        set.insert(r);
        found.insert(Segment::new("trailer1"), set);
        merge_hit(
            &mut data,
            SearchHit {
                found,
                missing: vec![Segment::new("tractor")],
                veh_cfg: None,
            },
            &settings,
        );
        match &data {
            Some(SensorData::Multi { segments, .. }) => {
                assert!(segments[&Segment::new("tractor")].is_some());
            }
            other => panic!("expected multi shape, got {other:?}"),
        }
    }
}
