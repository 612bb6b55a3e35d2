//! Core data types for the indoor positioning system

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::constants::{
    HIGH_CONFIDENCE_MATCH_SCORE, HIGH_CONFIDENCE_UNCERTAINTY_M, MEDIUM_CONFIDENCE_MATCH_SCORE,
    MEDIUM_CONFIDENCE_UNCERTAINTY_M,
};

/// Coarse quality bucket attached to every position fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationConfidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl LocationConfidence {
    /// Bucket a trilateration residual uncertainty (meters)
    pub fn from_uncertainty(uncertainty_m: f64) -> Self {
        if uncertainty_m < HIGH_CONFIDENCE_UNCERTAINTY_M {
            LocationConfidence::High
        } else if uncertainty_m < MEDIUM_CONFIDENCE_UNCERTAINTY_M {
            LocationConfidence::Medium
        } else {
            LocationConfidence::Low
        }
    }

    /// Bucket a normalized fingerprint match score
    pub fn from_match_score(score: f64) -> Self {
        if score < HIGH_CONFIDENCE_MATCH_SCORE {
            LocationConfidence::High
        } else if score < MEDIUM_CONFIDENCE_MATCH_SCORE {
            LocationConfidence::Medium
        } else {
            LocationConfidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationConfidence::High => "high",
            LocationConfidence::Medium => "medium",
            LocationConfidence::Low => "low",
            LocationConfidence::Unknown => "unknown",
        }
    }
}

/// Algorithm that produced a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositioningMethod {
    RssiTrilateration,
    Tdoa,
    Aoa,
    Fingerprinting,
    DeadReckoning,
    Hybrid,
}

impl PositioningMethod {
    pub const ALL: [PositioningMethod; 6] = [
        PositioningMethod::RssiTrilateration,
        PositioningMethod::Tdoa,
        PositioningMethod::Aoa,
        PositioningMethod::Fingerprinting,
        PositioningMethod::DeadReckoning,
        PositioningMethod::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PositioningMethod::RssiTrilateration => "rssi_trilateration",
            PositioningMethod::Tdoa => "tdoa",
            PositioningMethod::Aoa => "aoa",
            PositioningMethod::Fingerprinting => "fingerprinting",
            PositioningMethod::DeadReckoning => "dead_reckoning",
            PositioningMethod::Hybrid => "hybrid",
        }
    }
}

/// 3D position in the local frame (meters) with its uncertainty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Estimated error radius (meters, never negative)
    pub uncertainty: f64,
    pub confidence: LocationConfidence,
    pub timestamp: DateTime<Utc>,
    pub method: PositioningMethod,
}

impl Position {
    /// Create a position stamped with the current time.
    ///
    /// Negative or NaN uncertainty is clamped to zero.
    pub fn new(
        x: f64,
        y: f64,
        z: f64,
        uncertainty: f64,
        confidence: LocationConfidence,
        method: PositioningMethod,
    ) -> Self {
        Self {
            x,
            y,
            z,
            uncertainty: if uncertainty > 0.0 { uncertainty } else { 0.0 },
            confidence,
            timestamp: Utc::now(),
            method,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn to_vector3(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean distance in 3D
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.to_vector3() - other.to_vector3()).norm()
    }

    /// Seconds elapsed from `earlier` to this position (negative if out of order)
    pub fn seconds_since(&self, earlier: &Position) -> f64 {
        let delta = self.timestamp - earlier.timestamp;
        match delta.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => delta.num_milliseconds() as f64 / 1000.0,
        }
    }
}

/// Access point with a surveyed location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPointLocation {
    pub bssid: String,
    pub ssid: String,
    pub position: Position,
    /// Transmit power (dBm)
    pub tx_power: f64,
    /// Antenna gain (dBi)
    pub antenna_gain: f64,
    /// Carrier frequency (Hz)
    pub frequency: f64,
}

/// Single RSSI observation of an access point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssiMeasurement {
    pub bssid: String,
    /// Received signal strength (dBm)
    pub rssi: f64,
    pub timestamp: DateTime<Utc>,
    pub channel: u32,
    /// Carrier frequency (Hz)
    pub frequency: f64,
}

impl RssiMeasurement {
    pub fn new(bssid: impl Into<String>, rssi: f64, channel: u32, frequency: f64) -> Self {
        Self {
            bssid: bssid.into(),
            rssi,
            timestamp: Utc::now(),
            channel,
            frequency,
        }
    }
}
