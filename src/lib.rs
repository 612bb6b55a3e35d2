//! Indoor Geospatial Intelligence
//!
//! Estimates the position of a WiFi sensing device from access-point RSSI
//! (log-distance trilateration with a fingerprint-matching fallback),
//! synthesizes a topological floor plan from accumulated position density,
//! and classifies the device's movement.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use crate::core::{AccessPointLocation, LocationConfidence, Position, PositioningMethod, RssiMeasurement};
pub use algorithms::{FingerprintingDatabase, RssiTrilateration};
pub use processing::{FloorPlan, FloorPlanGenerator, MovementAnalyzer, MovementClass, MovementPattern, Room};
pub use validation::{GeoError, GeoResult};
pub use utils::PlatformConfig;
pub use api::{GeospatialIntelligence, JsonFormatter, PositioningStats};
