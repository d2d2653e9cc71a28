//! Static tables of known sensor locations per vehicle segment.
//!
//! Pure data: every channel the remote service can expose for a fleet
//! vehicle, by segment, category, and location. The catalog builder resolves
//! each generated channel name to its remote id and unit once and persists
//! the result.

use crate::reading::{LocationKey, Segment, SensorCategory};

/// One known channel: where it lives and what it measures.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub segment: Segment,
    pub category: SensorCategory,
    pub location: LocationKey,
    pub name: String,
}

/// Segment names, in priority order.
pub const SEGMENTS: [&str; 3] = ["tractor", "trailer1", "trailer2"];

/// Temperature probe locations on the tractor.
const TRACTOR_TEMPERATURE_LOCATIONS: [&str; 2] = ["cab", "engine-bay"];

/// Temperature probe locations on a trailer (cargo zones).
const TRAILER_TEMPERATURE_LOCATIONS: [&str; 4] = ["zone1", "zone2", "zone3", "zone4"];

/// Tire positions on the tractor: single steer axle, dual drive axles.
const TRACTOR_TIRE_LOCATIONS: [&str; 10] = [
    "axle1-left",
    "axle1-right",
    "axle2-left-outer",
    "axle2-left-inner",
    "axle2-right-inner",
    "axle2-right-outer",
    "axle3-left-outer",
    "axle3-left-inner",
    "axle3-right-inner",
    "axle3-right-outer",
];

/// Tire positions on a trailer: three single-wheel axles per side.
const TRAILER_TIRE_LOCATIONS: [&str; 6] = [
    "axle1-left",
    "axle1-right",
    "axle2-left",
    "axle2-right",
    "axle3-left",
    "axle3-right",
];

/// Channel name for a `(segment, category, location)` triple.
pub fn channel_name(segment: &Segment, category: SensorCategory, location: &LocationKey) -> String {
    format!("{segment}.{}.{location}", category.tag())
}

fn specs_for(
    segment: &Segment,
    category: SensorCategory,
    locations: &[&str],
    out: &mut Vec<ChannelSpec>,
) {
    for location in locations {
        let location = LocationKey::new(*location);
        out.push(ChannelSpec {
            name: channel_name(segment, category, &location),
            segment: segment.clone(),
            category,
            location,
        });
    }
}

/// Every known channel across all segments.
pub fn known_channels() -> Vec<ChannelSpec> {
    let mut out = Vec::new();
    for segment_name in SEGMENTS {
        let segment = Segment::new(segment_name);
        let (temperature, tires): (&[&str], &[&str]) = if segment_name == "tractor" {
            (&TRACTOR_TEMPERATURE_LOCATIONS, &TRACTOR_TIRE_LOCATIONS)
        } else {
            (&TRAILER_TEMPERATURE_LOCATIONS, &TRAILER_TIRE_LOCATIONS)
        };
        specs_for(&segment, SensorCategory::Temperature, temperature, &mut out);
        specs_for(&segment, SensorCategory::TireTemperature, tires, &mut out);
        specs_for(&segment, SensorCategory::TirePressure, tires, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_are_unique() {
        let specs = known_channels();
        let mut names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), specs.len());
    }

    #[test]
    fn every_segment_has_all_categories() {
        let specs = known_channels();
        for segment_name in SEGMENTS {
            for category in SensorCategory::ALL {
                assert!(
                    specs
                        .iter()
                        .any(|s| s.segment.as_str() == segment_name && s.category == category),
                    "missing {category} channels for {segment_name}"
                );
            }
        }
    }

    #[test]
    fn tire_positions_carry_temperature_and_pressure() {
        let specs = known_channels();
        let temps: Vec<_> = specs
            .iter()
            .filter(|s| s.category == SensorCategory::TireTemperature)
            .map(|s| (s.segment.clone(), s.location.clone()))
            .collect();
        for spec in specs
            .iter()
            .filter(|s| s.category == SensorCategory::TirePressure)
        {
            assert!(temps.contains(&(spec.segment.clone(), spec.location.clone())));
        }
    }
}
