//! Orchestrator owning one instance of each positioning component.
//!
//! Not internally synchronized; wrap the whole instance in a mutex to share
//! it between threads.

use tracing::{debug, instrument};

use crate::algorithms::{FingerprintingDatabase, RssiTrilateration};
use crate::api::types::PositioningStats;
use crate::core::{AccessPointLocation, Position, RssiMeasurement};
use crate::processing::{FloorPlan, FloorPlanGenerator, MovementAnalyzer, MovementPattern};
use crate::utils::config::PlatformConfig;
use crate::validation::GeoResult;

#[derive(Debug, Clone)]
pub struct GeospatialIntelligence {
    rssi_trilateration: RssiTrilateration,
    fingerprinting_db: FingerprintingDatabase,
    floor_plan_generator: FloorPlanGenerator,
    movement_analyzer: MovementAnalyzer,
    ap_locations: Vec<AccessPointLocation>,
    position_history: Vec<Position>,
    min_access_points: usize,
}

impl Default for GeospatialIntelligence {
    fn default() -> Self {
        Self {
            rssi_trilateration: RssiTrilateration::new(),
            fingerprinting_db: FingerprintingDatabase::new(),
            floor_plan_generator: FloorPlanGenerator::new(),
            movement_analyzer: MovementAnalyzer::new(),
            ap_locations: Vec::new(),
            position_history: Vec::new(),
            min_access_points: PlatformConfig::default().min_access_points,
        }
    }
}

impl GeospatialIntelligence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PlatformConfig) -> GeoResult<Self> {
        config.validate()?;
        Ok(Self {
            rssi_trilateration: RssiTrilateration::with_config(config.trilateration)?,
            fingerprinting_db: FingerprintingDatabase::new(),
            floor_plan_generator: FloorPlanGenerator::with_config(config.floor_plan)?,
            movement_analyzer: MovementAnalyzer::with_config(config.movement)?,
            ap_locations: Vec::new(),
            position_history: Vec::new(),
            min_access_points: config.min_access_points,
        })
    }

    /// Register an access point, replacing any earlier one with the same bssid
    pub fn add_access_point(&mut self, ap_location: AccessPointLocation) {
        match self.ap_locations.iter_mut().find(|ap| ap.bssid == ap_location.bssid) {
            Some(existing) => {
                debug!(bssid = %ap_location.bssid, "access point location updated");
                *existing = ap_location;
            }
            None => {
                debug!(bssid = %ap_location.bssid, ssid = %ap_location.ssid, "access point registered");
                self.ap_locations.push(ap_location);
            }
        }
    }

    pub fn remove_access_point(&mut self, bssid: &str) -> Option<AccessPointLocation> {
        let index = self.ap_locations.iter().position(|ap| ap.bssid == bssid)?;
        Some(self.ap_locations.remove(index))
    }

    pub fn access_points(&self) -> &[AccessPointLocation] {
        &self.ap_locations
    }

    /// Estimate the current position: trilateration first, then fingerprint
    /// matching. Never blends the two.
    #[instrument(level = "debug", skip(self, measurements), fields(count = measurements.len()))]
    pub fn estimate_position(&mut self, measurements: &[RssiMeasurement]) -> Option<Position> {
        if self.ap_locations.len() >= self.min_access_points {
            if let Some(position) = self.rssi_trilateration.trilaterate(&self.ap_locations, measurements) {
                return Some(self.record(position));
            }
        }

        if let Some(position) = self.fingerprinting_db.match_fingerprint(measurements) {
            return Some(self.record(position));
        }

        debug!("no position estimate available");
        None
    }

    fn record(&mut self, position: Position) -> Position {
        debug!(
            method = position.method.as_str(),
            uncertainty = position.uncertainty,
            confidence = position.confidence.as_str(),
            "position estimated"
        );
        self.movement_analyzer.add_position(position.clone());
        self.position_history.push(position.clone());
        position
    }

    /// Add calibration measurements for a surveyed location
    pub fn train_fingerprinting(&mut self, location_id: &str, position: Position, measurements: &[RssiMeasurement]) {
        self.fingerprinting_db.add_fingerprint(location_id, position, measurements);
    }

    /// Floor plan over the whole position history.
    ///
    /// No per-position RSSI is retained, so rooms come from position density
    /// alone.
    pub fn generate_floor_plan(&self) -> GeoResult<FloorPlan> {
        let rssi_by_position: Vec<Vec<RssiMeasurement>> = Vec::new();
        self.floor_plan_generator.generate_floor_plan(&self.position_history, &rssi_by_position)
    }

    pub fn analyze_movement_patterns(&self) -> Vec<MovementPattern> {
        self.movement_analyzer.analyze_movement()
    }

    pub fn get_positioning_stats(&self) -> PositioningStats {
        let stats = PositioningStats::from_positions(&self.position_history);
        debug!(
            total = stats.total_positions,
            avg_accuracy = stats.avg_accuracy,
            coverage_area = stats.coverage_area,
            "positioning stats computed"
        );
        stats
    }

    pub fn position_history(&self) -> &[Position] {
        &self.position_history
    }

    pub fn fingerprint_database(&self) -> &FingerprintingDatabase {
        &self.fingerprinting_db
    }

    pub fn movement_analyzer(&self) -> &MovementAnalyzer {
        &self.movement_analyzer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LocationConfidence, PositioningMethod};
    use crate::processing::MovementClass;
    use crate::utils::config::MovementConfig;
    use chrono::{Duration, Utc};

    fn access_point(bssid: &str, x: f64, y: f64) -> AccessPointLocation {
        AccessPointLocation {
            bssid: bssid.to_string(),
            ssid: "corp".to_string(),
            position: Position::new(x, y, 0.0, 0.5, LocationConfidence::High, PositioningMethod::RssiTrilateration),
            tx_power: -40.0,
            antenna_gain: 2.0,
            frequency: 2.4e9,
        }
    }

    fn surveyed_site() -> GeospatialIntelligence {
        let mut geo = GeospatialIntelligence::new();
        geo.add_access_point(access_point("ap-1", 0.0, 0.0));
        geo.add_access_point(access_point("ap-2", 10.0, 0.0));
        geo.add_access_point(access_point("ap-3", 5.0, 10.0));
        geo
    }

    /// Noise-free scan of the three surveyed APs from (x, y, 0)
    fn scan_from(x: f64, y: f64) -> Vec<RssiMeasurement> {
        [("ap-1", 0.0, 0.0), ("ap-2", 10.0, 0.0), ("ap-3", 5.0, 10.0)]
            .iter()
            .map(|(bssid, ax, ay)| {
                let d: f64 = ((x - ax).powi(2) + (y - ay).powi(2)).sqrt();
                RssiMeasurement::new(*bssid, -40.0 - 20.0 * d.log10(), 6, 2.437e9)
            })
            .collect()
    }

    #[test]
    fn test_trilateration_preferred_when_aps_registered() {
        let mut geo = surveyed_site();
        let position = geo.estimate_position(&scan_from(4.0, 3.0)).unwrap();

        assert_eq!(position.method, PositioningMethod::RssiTrilateration);
        assert!((position.x - 4.0).abs() < 0.1 && (position.y - 3.0).abs() < 0.1);
        assert_eq!(geo.position_history().len(), 1);
        assert_eq!(geo.movement_analyzer().len(), 1);
    }

    #[test]
    fn test_falls_back_to_fingerprinting() {
        let mut geo = GeospatialIntelligence::new();
        geo.add_access_point(access_point("ap-1", 0.0, 0.0));
        let training = Position::new(7.0, 2.0, 0.0, 1.0, LocationConfidence::High, PositioningMethod::Fingerprinting);
        geo.train_fingerprinting("desk", training, &scan_from(7.0, 2.0));

        let position = geo.estimate_position(&scan_from(7.0, 2.0)).unwrap();
        assert_eq!(position.method, PositioningMethod::Fingerprinting);
        assert_eq!((position.x, position.y), (7.0, 2.0));
        assert_eq!(position.confidence, LocationConfidence::High);
    }

    #[test]
    fn test_unmatched_scan_falls_back_then_fails() {
        let mut geo = surveyed_site();
        let foreign = vec![
            RssiMeasurement::new("other-1", -50.0, 1, 2.412e9),
            RssiMeasurement::new("other-2", -55.0, 1, 2.412e9),
            RssiMeasurement::new("other-3", -60.0, 1, 2.412e9),
        ];
        assert!(geo.estimate_position(&foreign).is_none());
        assert!(geo.position_history().is_empty());

        let training = Position::new(1.0, 1.0, 0.0, 1.0, LocationConfidence::High, PositioningMethod::Fingerprinting);
        geo.train_fingerprinting("annex", training, &foreign);
        let position = geo.estimate_position(&foreign).unwrap();
        assert_eq!(position.method, PositioningMethod::Fingerprinting);
    }

    #[test]
    fn test_stats_count_successful_estimates() {
        let mut geo = surveyed_site();
        assert_eq!(geo.get_positioning_stats(), PositioningStats::default());

        let spots = [(4.0, 3.0), (6.0, 2.0), (5.0, 5.0), (3.0, 4.0)];
        for (x, y) in spots {
            assert!(geo.estimate_position(&scan_from(x, y)).is_some());
        }
        assert!(geo.estimate_position(&[]).is_none());

        let stats = geo.get_positioning_stats();
        assert_eq!(stats.total_positions, spots.len());
        assert_eq!(stats.positioning_methods[&PositioningMethod::RssiTrilateration], spots.len());
        assert!(stats.coverage_area > 0.0);
        assert!(stats.worst_accuracy < 0.01);
    }

    #[test]
    fn test_access_point_registration_is_keyed_by_bssid() {
        let mut geo = surveyed_site();
        geo.add_access_point(access_point("ap-2", 12.0, 1.0));
        assert_eq!(geo.access_points().len(), 3);
        assert_eq!(geo.access_points()[1].position.x, 12.0);

        let removed = geo.remove_access_point("ap-3").unwrap();
        assert_eq!(removed.bssid, "ap-3");
        assert!(geo.remove_access_point("ap-3").is_none());
        assert_eq!(geo.access_points().len(), 2);
    }

    #[test]
    fn test_floor_plan_and_movement_from_history() {
        let mut geo = surveyed_site();
        assert!(geo.analyze_movement_patterns().is_empty());
        let plan = geo.generate_floor_plan().unwrap();
        assert!(plan.rooms.is_empty());

        for (x, y) in [(4.0, 3.0), (4.1, 3.0), (4.2, 3.1)] {
            geo.estimate_position(&scan_from(x, y)).unwrap();
        }

        let plan = geo.generate_floor_plan().unwrap();
        assert_eq!(plan.metadata.num_positions, 3);
        assert!(plan.metadata.confidence <= 0.5 + 1e-9);
        assert_eq!(geo.movement_analyzer().len(), 3);
    }

    #[test]
    fn test_recorded_fixes_drive_movement_analysis() {
        let mut geo = GeospatialIntelligence::new();
        let start = Utc::now();
        for i in 0..4 {
            let fix = Position::new(0.0, i as f64, 0.0, 0.5, LocationConfidence::High, PositioningMethod::RssiTrilateration)
                .with_timestamp(start + Duration::seconds(i));
            geo.record(fix);
        }

        let patterns = geo.analyze_movement_patterns();
        assert_eq!(patterns.len(), 1);
        let pattern = &patterns[0];
        assert_eq!(pattern.path.len(), 4);
        assert!((pattern.velocity - 1.0).abs() < 1e-9);
        assert!((pattern.direction - 90.0).abs() < 1e-9);
        assert!((pattern.duration - 3.0).abs() < 1e-9);
        assert_eq!(pattern.classification, MovementClass::Walking);
        assert_eq!(geo.position_history().len(), 4);
    }

    #[test]
    fn test_with_config_applies_sections() {
        let config = PlatformConfig {
            movement: MovementConfig {
                history_capacity: 2,
                ..MovementConfig::default()
            },
            ..PlatformConfig::default()
        };
        let mut geo = GeospatialIntelligence::with_config(config).unwrap();
        geo.add_access_point(access_point("ap-1", 0.0, 0.0));
        geo.add_access_point(access_point("ap-2", 10.0, 0.0));
        geo.add_access_point(access_point("ap-3", 5.0, 10.0));
        for (x, y) in [(4.0, 3.0), (6.0, 2.0), (5.0, 5.0)] {
            geo.estimate_position(&scan_from(x, y)).unwrap();
        }
        assert_eq!(geo.position_history().len(), 3);
        assert_eq!(geo.movement_analyzer().len(), 2);

        let mut bad = PlatformConfig::default();
        bad.floor_plan.grid_resolution = -1.0;
        assert!(GeospatialIntelligence::with_config(bad).is_err());
    }
}
