//! Empirical location matching against a trained radio map.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

use crate::core::{LocationConfidence, Position, PositioningMethod, RssiMeasurement, MIN_REFERENCE_POINTS};
use crate::validation::usable_measurements;

/// Running RSSI statistics for one access point at one location.
///
/// Welford accumulator, so memory does not grow with the number of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RssiStatistics {
    pub count: u64,
    pub mean: f64,
    m2: f64,
}

impl RssiStatistics {
    pub fn push(&mut self, rssi: f64) {
        self.count += 1;
        let delta = rssi - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (rssi - self.mean);
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).max(0.0).sqrt()
        }
    }

    /// Matching weight; stable access points count more
    pub fn weight(&self) -> f64 {
        1.0 / (self.std_dev() + 1.0)
    }
}

/// Recorded position and per-AP statistics for one calibration point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub position: Position,
    pub access_points: HashMap<String, RssiStatistics>,
}

/// Best candidate found by [`FingerprintingDatabase::match_fingerprint`]
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintMatch {
    pub location_id: String,
    /// Weighted mean squared RSSI deviation over common APs (dB²)
    pub score: f64,
    pub common_access_points: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FingerprintingDatabase {
    // Ordered so equal scores resolve deterministically
    fingerprints: BTreeMap<String, Fingerprint>,
}

impl FingerprintingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of calibration measurements into `location_id`.
    ///
    /// The first call for a location fixes its position.
    pub fn add_fingerprint(&mut self, location_id: &str, position: Position, measurements: &[RssiMeasurement]) {
        let fingerprint = self
            .fingerprints
            .entry(location_id.to_string())
            .or_insert_with(|| Fingerprint {
                position,
                access_points: HashMap::new(),
            });

        let mut added = 0usize;
        for m in usable_measurements(measurements) {
            fingerprint.access_points.entry(m.bssid.clone()).or_default().push(m.rssi);
            added += 1;
        }

        debug!(location_id, samples = added, access_points = fingerprint.access_points.len(), "fingerprint updated");
    }

    /// Find the trained location whose radio map is closest to `measurements`.
    pub fn find_best_match(&self, measurements: &[RssiMeasurement]) -> Option<FingerprintMatch> {
        let observed: HashMap<&str, f64> = usable_measurements(measurements)
            .map(|m| (m.bssid.as_str(), m.rssi))
            .collect();

        let mut best: Option<FingerprintMatch> = None;

        for (location_id, fingerprint) in &self.fingerprints {
            let mut score = 0.0;
            let mut common = 0usize;

            for (bssid, stats) in &fingerprint.access_points {
                if let Some(rssi) = observed.get(bssid.as_str()) {
                    score += stats.weight() * (stats.mean - rssi).powi(2);
                    common += 1;
                }
            }

            if common < MIN_REFERENCE_POINTS {
                trace!(location_id = %location_id, common, "location not eligible");
                continue;
            }

            let normalized = score / common as f64;
            if best.as_ref().map_or(true, |b| normalized < b.score) {
                best = Some(FingerprintMatch {
                    location_id: location_id.clone(),
                    score: normalized,
                    common_access_points: common,
                });
            }
        }

        best
    }

    /// Match live measurements against the radio map.
    ///
    /// Returns `None` when no location shares at least three APs with the
    /// measurement set.
    pub fn match_fingerprint(&self, measurements: &[RssiMeasurement]) -> Option<Position> {
        let Some(best) = self.find_best_match(measurements) else {
            debug!(locations = self.fingerprints.len(), "no eligible fingerprint location");
            return None;
        };
        let fingerprint = self.fingerprints.get(&best.location_id)?;

        debug!(location_id = %best.location_id, score = best.score, common = best.common_access_points, "fingerprint matched");

        Some(Position::new(
            fingerprint.position.x,
            fingerprint.position.y,
            fingerprint.position.z,
            best.score.sqrt(),
            LocationConfidence::from_match_score(best.score),
            PositioningMethod::Fingerprinting,
        ))
    }

    pub fn location_count(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn location(&self, location_id: &str) -> Option<&Fingerprint> {
        self.fingerprints.get(location_id)
    }

    pub fn statistics(&self, location_id: &str, bssid: &str) -> Option<&RssiStatistics> {
        self.fingerprints.get(location_id)?.access_points.get(bssid)
    }

    pub fn remove_location(&mut self, location_id: &str) -> Option<Fingerprint> {
        self.fingerprints.remove(location_id)
    }
}
