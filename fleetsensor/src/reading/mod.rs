//! Sensor reading types, unit conversion, and record classification.

mod classify;
mod types;
mod units;

pub use classify::classify;
pub use types::{
    ComponentSensorSet, EntityId, Freshness, LocationKey, Reading, Segment, SensorCategory,
    SensorValue, VehicleConfig,
};
pub use units::{pressure_from_kilopascals, round1, temperature_from_celsius};
