//! FleetSensor - telemetry acquisition and caching for fleet vehicles
//!
//! This library retrieves time-series sensor readings (temperature, tire
//! temperature, tire pressure) for tracked vehicles from a remote batch
//! query service and maintains a per-entity cache that is incrementally
//! refreshed and merged by sensor location.
//!
//! # High-Level API
//!
//! The [`engine`] module provides the facade consumers hold:
//!
//! ```ignore
//! use fleetsensor::config::EngineSettings;
//! use fleetsensor::engine::TelemetryEngine;
//! use fleetsensor::query::HttpQueryClient;
//! use fleetsensor::reading::EntityId;
//! use fleetsensor::store::FileKvStore;
//!
//! let client = HttpQueryClient::new("https://telemetry.example.com")?;
//! let store = FileKvStore::open("/var/lib/fleetsensor")?;
//! let engine = TelemetryEngine::new(client, store, EngineSettings::default());
//!
//! let outcome = engine
//!     .fetch_cached_sensor_data(&EntityId::new("veh-1"), "Truck 1")
//!     .await?;
//! ```
//!
//! # Architecture
//!
//! A fetch flows through: single-flight admission in [`cache`], the
//! window-ladder retry protocol in [`search`] (planning queries through the
//! persisted channel [`catalog`]), record classification in [`reading`],
//! and finally the location-keyed merge back into the cache.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod query;
pub mod reading;
pub mod search;
pub mod store;
pub mod time;

pub use engine::{FetchOutcome, TelemetryEngine};
pub use error::FetchError;

/// Version of the FleetSensor library and CLI.
///
/// Synchronized across all components in the workspace; defined in
/// `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
