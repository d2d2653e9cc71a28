//! Core types for classified sensor readings.
//!
//! A [`Reading`] is one timestamped, unit-converted sensor value at a
//! physical location on a vehicle segment. Readings are grouped by category
//! and location into a [`ComponentSensorSet`], one per segment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a tracked vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A physical component of a multi-part vehicle (e.g. "tractor", "trailer1").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Segment(String);

impl Segment {
    /// Create a new segment identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The segment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Sensor location within a `(segment, category)` pair, e.g. "axle1-left-outer".
///
/// Unique within its pair; two categories may reuse the same location name
/// (a tire position carries both a temperature and a pressure channel).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    /// Create a new location key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Category of a sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorCategory {
    /// Ambient / cargo-zone temperature.
    Temperature,
    /// Tire temperature.
    TireTemperature,
    /// Tire pressure.
    TirePressure,
}

impl SensorCategory {
    /// All categories, in catalog order.
    pub const ALL: [SensorCategory; 3] = [
        SensorCategory::Temperature,
        SensorCategory::TireTemperature,
        SensorCategory::TirePressure,
    ];

    /// Short tag used in channel names.
    pub fn tag(&self) -> &'static str {
        match self {
            SensorCategory::Temperature => "temp",
            SensorCategory::TireTemperature => "tire-temp",
            SensorCategory::TirePressure => "tire-pressure",
        }
    }
}

impl fmt::Display for SensorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tri-state freshness marker driving UI highlighting.
///
/// A location updated by a merge pass is `Fresh`. The next merge pass that
/// does not touch it ages it to `PendingClear` (one more highlighted render
/// cycle), and the pass after that settles it to `Stale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Freshness {
    /// Updated by the most recent merge pass.
    Fresh,
    /// Aged once; still flagged for one more render cycle.
    PendingClear,
    /// Steady; no recent change.
    Stale,
}

impl Freshness {
    /// Advance one step in the aging cycle. `Stale` is absorbing.
    pub fn aged(self) -> Self {
        match self {
            Freshness::Fresh => Freshness::PendingClear,
            Freshness::PendingClear => Freshness::Stale,
            Freshness::Stale => Freshness::Stale,
        }
    }

    /// Whether the UI should still highlight this reading.
    pub fn is_highlighted(self) -> bool {
        !matches!(self, Freshness::Stale)
    }
}

/// Unit-converted sensor value, derived at classification time.
///
/// Conversion happens once, when the raw record is classified; consumers
/// never convert at render time. All derived values are rounded to one
/// decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorValue {
    /// Temperature reading: raw Celsius plus derived Fahrenheit.
    Temperature { celsius: f64, fahrenheit: f64 },
    /// Pressure reading: raw kilopascals plus derived psi and bar.
    Pressure { kilopascals: f64, psi: f64, bar: f64 },
}

impl SensorValue {
    /// The native (as-transmitted) value.
    pub fn native(&self) -> f64 {
        match self {
            SensorValue::Temperature { celsius, .. } => *celsius,
            SensorValue::Pressure { kilopascals, .. } => *kilopascals,
        }
    }
}

/// One classified, timestamped sensor value at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Location of the sensor within its `(segment, category)` pair.
    pub location: LocationKey,
    /// Category of the source channel.
    pub category: SensorCategory,
    /// Sample time, unix seconds.
    pub time: i64,
    /// Owning vehicle segment.
    pub segment: Segment,
    /// Unit-converted value.
    pub value: SensorValue,
    /// Freshness marker; maintained by the merge engine.
    pub freshness: Freshness,
}

/// Classified readings for one vehicle segment, keyed by category then
/// location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSensorSet {
    readings: HashMap<SensorCategory, HashMap<LocationKey, Reading>>,
}

impl ComponentSensorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a reading.
    pub fn get(&self, category: SensorCategory, location: &LocationKey) -> Option<&Reading> {
        self.readings.get(&category)?.get(location)
    }

    /// Insert a reading under its own category and location, replacing any
    /// previous reading at that slot.
    pub fn insert(&mut self, reading: Reading) {
        self.readings
            .entry(reading.category)
            .or_default()
            .insert(reading.location.clone(), reading);
    }

    /// Iterate all readings.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.values().flat_map(|locs| locs.values())
    }

    /// Readings in one category.
    pub fn category(&self, category: SensorCategory) -> impl Iterator<Item = &Reading> {
        self.readings
            .get(&category)
            .into_iter()
            .flat_map(|locs| locs.values())
    }

    /// Total number of readings across all categories.
    pub fn len(&self) -> usize {
        self.readings.values().map(|locs| locs.len()).sum()
    }

    /// Whether the set holds no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.values().all(|locs| locs.is_empty())
    }

    /// Age every reading one freshness step.
    ///
    /// Called by the merge engine before overlaying fresh data, so that a
    /// location untouched by the incoming pass decays `Fresh` →
    /// `PendingClear` → `Stale`.
    pub fn age_all(&mut self) {
        for locs in self.readings.values_mut() {
            for reading in locs.values_mut() {
                reading.freshness = reading.freshness.aged();
            }
        }
    }

    /// Consume the set, yielding every reading.
    pub(crate) fn drain(self) -> impl Iterator<Item = Reading> {
        self.readings
            .into_values()
            .flat_map(|locs| locs.into_values())
    }
}

/// Segments detected for a multi-segment vehicle and which one is currently
/// the "driving" result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Segments observed in query results (fetched or recorded absent).
    pub segments_found: Vec<Segment>,
    /// Number of segments in the resolved per-segment map.
    pub total: usize,
    /// The segment currently selected by priority order.
    pub active: Segment,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(location: &str, time: i64) -> Reading {
        Reading {
            location: LocationKey::new(location),
            category: SensorCategory::TirePressure,
            time,
            segment: Segment::new("tractor"),
            value: SensorValue::Pressure {
                kilopascals: 800.0,
                psi: 116.0,
                bar: 8.0,
            },
            freshness: Freshness::Fresh,
        }
    }

    #[test]
    fn freshness_ages_without_skipping_pending_clear() {
        assert_eq!(Freshness::Fresh.aged(), Freshness::PendingClear);
        assert_eq!(Freshness::PendingClear.aged(), Freshness::Stale);
        assert_eq!(Freshness::Stale.aged(), Freshness::Stale);
    }

    #[test]
    fn fresh_and_pending_clear_are_highlighted() {
        assert!(Freshness::Fresh.is_highlighted());
        assert!(Freshness::PendingClear.is_highlighted());
        assert!(!Freshness::Stale.is_highlighted());
    }

    #[test]
    fn set_insert_and_get_by_category_and_location() {
        let mut set = ComponentSensorSet::new();
        set.insert(reading("axle1-left-outer", 100));
        set.insert(reading("axle1-right-outer", 120));

        let hit = set
            .get(
                SensorCategory::TirePressure,
                &LocationKey::new("axle1-left-outer"),
            )
            .unwrap();
        assert_eq!(hit.time, 100);
        assert_eq!(set.len(), 2);
        assert!(set
            .get(
                SensorCategory::TireTemperature,
                &LocationKey::new("axle1-left-outer")
            )
            .is_none());
    }

    #[test]
    fn age_all_advances_every_reading() {
        let mut set = ComponentSensorSet::new();
        set.insert(reading("axle1-left-outer", 100));
        set.age_all();
        let hit = set
            .get(
                SensorCategory::TirePressure,
                &LocationKey::new("axle1-left-outer"),
            )
            .unwrap();
        assert_eq!(hit.freshness, Freshness::PendingClear);
        set.age_all();
        let hit = set
            .get(
                SensorCategory::TirePressure,
                &LocationKey::new("axle1-left-outer"),
            )
            .unwrap();
        assert_eq!(hit.freshness, Freshness::Stale);
    }
}
