//! Error taxonomy and input validation

pub mod data;
pub mod error;

pub use data::{check_measurement, usable_measurements, MeasurementDefect};
pub use error::{GeoError, GeoResult};
