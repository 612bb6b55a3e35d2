//! Per-measurement usability checks.
//!
//! A malformed measurement is dropped on its own; the rest of the batch is
//! still processed.

use crate::core::RssiMeasurement;
use tracing::trace;

/// Reason a measurement was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementDefect {
    EmptyBssid,
    NonFiniteRssi,
}

/// Classify a single measurement
pub fn check_measurement(measurement: &RssiMeasurement) -> Result<(), MeasurementDefect> {
    if measurement.bssid.trim().is_empty() {
        return Err(MeasurementDefect::EmptyBssid);
    }
    if !measurement.rssi.is_finite() {
        return Err(MeasurementDefect::NonFiniteRssi);
    }
    Ok(())
}

/// Iterate over the measurements that can be used, logging the rest
pub fn usable_measurements(
    measurements: &[RssiMeasurement],
) -> impl Iterator<Item = &RssiMeasurement> {
    measurements.iter().filter(|m| match check_measurement(m) {
        Ok(()) => true,
        Err(defect) => {
            trace!(bssid = %m.bssid, rssi = m.rssi, ?defect, "skipping malformed measurement");
            false
        }
    })
}
