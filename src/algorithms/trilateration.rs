use nalgebra::{DMatrix, DVector, Vector3};
use tracing::{debug, trace};

use crate::core::{AccessPointLocation, LocationConfidence, Position, PositioningMethod, RssiMeasurement, MIN_REFERENCE_POINTS};
use crate::utils::config::TrilaterationConfig;
use crate::validation::{usable_measurements, GeoResult};

/// RSSI trilateration using the log-distance path-loss model and a bounded
/// Levenberg-Marquardt least-squares solve.
#[derive(Debug, Clone, Default)]
pub struct RssiTrilateration {
    config: TrilaterationConfig,
}

/// Result of one least-squares solve
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    /// Final estimate in the local frame
    pub estimate: Vector3<f64>,
    /// Sum of squared range residuals at `estimate`
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl RssiTrilateration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrilaterationConfig) -> GeoResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrilaterationConfig {
        &self.config
    }

    /// Convert an RSSI reading into a range estimate (meters).
    ///
    /// Readings at or above the transmit power are inside the reference
    /// radius and clamp to `reference_distance`.
    pub fn estimate_distance(&self, rssi: f64, tx_power: f64) -> f64 {
        if rssi >= tx_power {
            return self.config.reference_distance;
        }
        let exponent = (tx_power - rssi) / (10.0 * self.config.path_loss_exponent);
        self.config.reference_distance * 10f64.powf(exponent)
    }

    /// Estimate the receiver position from measurements of surveyed APs.
    ///
    /// Returns `None` when fewer than three measurements can be matched to a
    /// registered AP, or when the solver does not converge.
    pub fn trilaterate(
        &self,
        ap_positions: &[AccessPointLocation],
        measurements: &[RssiMeasurement],
    ) -> Option<Position> {
        if ap_positions.len() < MIN_REFERENCE_POINTS || measurements.len() < MIN_REFERENCE_POINTS {
            debug!(
                access_points = ap_positions.len(),
                measurements = measurements.len(),
                "insufficient data for trilateration"
            );
            return None;
        }

        // First registered AP with a matching bssid wins
        let anchors: Vec<(Vector3<f64>, f64)> = usable_measurements(measurements)
            .filter_map(|m| {
                let ap = ap_positions.iter().find(|ap| ap.bssid == m.bssid)?;
                Some((ap.position.to_vector3(), self.estimate_distance(m.rssi, ap.tx_power)))
            })
            .collect();

        if anchors.len() < MIN_REFERENCE_POINTS {
            debug!(matched = anchors.len(), "insufficient matched access points for trilateration");
            return None;
        }

        let outcome = self.solve(&anchors);
        if !outcome.converged {
            debug!(
                iterations = outcome.iterations,
                cost = outcome.cost,
                "trilateration solver did not converge"
            );
            return None;
        }

        let uncertainty = (outcome.cost / anchors.len() as f64).sqrt();
        trace!(
            x = outcome.estimate.x,
            y = outcome.estimate.y,
            z = outcome.estimate.z,
            uncertainty,
            iterations = outcome.iterations,
            "trilateration converged"
        );

        Some(Position::new(
            outcome.estimate.x,
            outcome.estimate.y,
            outcome.estimate.z,
            uncertainty,
            LocationConfidence::from_uncertainty(uncertainty),
            PositioningMethod::RssiTrilateration,
        ))
    }

    /// Minimize Σ(‖p − aᵢ‖ − dᵢ)² starting from the anchor centroid.
    ///
    /// Iterates are kept inside the anchor bounding box grown by the largest
    /// range on every side.
    pub fn solve(&self, anchors: &[(Vector3<f64>, f64)]) -> SolverOutcome {
        let (lower, upper) = Self::search_bounds(anchors);
        let mut estimate = Self::centroid(anchors);
        let (mut residuals, mut jacobian) = Self::compute_residuals_and_jacobian(anchors, &estimate);
        let mut cost = residuals.dot(&residuals);

        let mut lambda = 1e-3;
        let mut nu = 2.0;

        for iteration in 0..self.config.max_iterations {
            if !cost.is_finite() {
                break;
            }

            let gradient = jacobian.transpose() * &residuals;
            if gradient.norm() < self.config.gradient_tolerance {
                return SolverOutcome { estimate, cost, iterations: iteration, converged: true };
            }

            let jt_j = jacobian.transpose() * &jacobian;
            let mut augmented = jt_j.clone();
            for i in 0..3 {
                augmented[(i, i)] += lambda * (1.0 + jt_j[(i, i)]);
            }

            let step = match Self::solve_linear_system(&augmented, &(-&gradient)) {
                Some(step) => step,
                None => break,
            };

            let candidate = Self::project(estimate + Vector3::new(step[0], step[1], step[2]), &lower, &upper);
            let (new_residuals, new_jacobian) = Self::compute_residuals_and_jacobian(anchors, &candidate);
            let new_cost = new_residuals.dot(&new_residuals);

            if new_cost.is_finite() && new_cost < cost {
                let improvement = cost - new_cost;
                estimate = candidate;
                residuals = new_residuals;
                jacobian = new_jacobian;
                cost = new_cost;

                lambda = (lambda / 3.0).max(1e-12);
                nu = 2.0;

                if improvement <= self.config.cost_tolerance * (1.0 + cost) {
                    return SolverOutcome { estimate, cost, iterations: iteration + 1, converged: true };
                }
            } else {
                lambda *= nu;
                nu = (nu * 2.0).min(16.0);

                // No step improves the cost: accept only if this is a stationary point
                if lambda > 1e10 {
                    let converged = gradient.norm() <= 1e-6 * (1.0 + cost);
                    return SolverOutcome { estimate, cost, iterations: iteration + 1, converged };
                }
            }
        }

        SolverOutcome {
            estimate,
            cost,
            iterations: self.config.max_iterations,
            converged: false,
        }
    }

    fn compute_residuals_and_jacobian(
        anchors: &[(Vector3<f64>, f64)],
        estimate: &Vector3<f64>,
    ) -> (DVector<f64>, DMatrix<f64>) {
        let n = anchors.len();
        let mut residuals = DVector::zeros(n);
        let mut jacobian = DMatrix::zeros(n, 3);

        for (i, (anchor, range)) in anchors.iter().enumerate() {
            let diff = estimate - anchor;
            let predicted_range = diff.norm();

            residuals[i] = predicted_range - range;

            if predicted_range > 1e-10 {
                let unit_vector = diff / predicted_range;
                jacobian[(i, 0)] = unit_vector.x;
                jacobian[(i, 1)] = unit_vector.y;
                jacobian[(i, 2)] = unit_vector.z;
            }
        }

        (residuals, jacobian)
    }

    fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
        let svd = a.clone().svd(true, true);
        svd.solve(b, 1e-12).ok()
    }

    fn centroid(anchors: &[(Vector3<f64>, f64)]) -> Vector3<f64> {
        anchors.iter().fold(Vector3::zeros(), |acc, (p, _)| acc + p) / anchors.len() as f64
    }

    fn search_bounds(anchors: &[(Vector3<f64>, f64)]) -> (Vector3<f64>, Vector3<f64>) {
        let max_range = anchors.iter().map(|(_, r)| *r).fold(0.0, f64::max);
        let mut lower = Vector3::repeat(f64::INFINITY);
        let mut upper = Vector3::repeat(f64::NEG_INFINITY);
        for (p, _) in anchors {
            lower = lower.inf(p);
            upper = upper.sup(p);
        }
        (lower.add_scalar(-max_range), upper.add_scalar(max_range))
    }

    fn project(point: Vector3<f64>, lower: &Vector3<f64>, upper: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            point.x.max(lower.x).min(upper.x),
            point.y.max(lower.y).min(upper.y),
            point.z.max(lower.z).min(upper.z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access_point(bssid: &str, x: f64, y: f64, z: f64, tx_power: f64) -> AccessPointLocation {
        AccessPointLocation {
            bssid: bssid.to_string(),
            ssid: format!("ssid-{}", bssid),
            position: Position::new(x, y, z, 0.5, LocationConfidence::High, PositioningMethod::RssiTrilateration),
            tx_power,
            antenna_gain: 2.0,
            frequency: 2.4e9,
        }
    }

    /// RSSI the path-loss model predicts at `distance` meters
    fn synthetic_rssi(tx_power: f64, distance: f64, exponent: f64) -> f64 {
        tx_power - 10.0 * exponent * distance.log10()
    }

    fn measurements_for(aps: &[AccessPointLocation], truth: Vector3<f64>) -> Vec<RssiMeasurement> {
        aps.iter()
            .map(|ap| {
                let d = (truth - ap.position.to_vector3()).norm();
                RssiMeasurement::new(ap.bssid.clone(), synthetic_rssi(ap.tx_power, d, 2.0), 6, 2.437e9)
            })
            .collect()
    }

    #[test]
    fn test_distance_at_tx_power_is_reference_distance() {
        let tri = RssiTrilateration::new();
        for tx in [-60.0, -40.0, 0.0, 20.0] {
            assert_eq!(tri.estimate_distance(tx, tx), 1.0);
        }
        // Stronger than predicted at the reference radius also clamps
        assert_eq!(tri.estimate_distance(-30.0, -40.0), 1.0);
    }

    #[test]
    fn test_log_distance_model() {
        let tri = RssiTrilateration::new();
        assert!((tri.estimate_distance(-60.0, -40.0) - 10.0).abs() < 1e-9);
        assert!((tri.estimate_distance(-80.0, -40.0) - 100.0).abs() < 1e-9);

        let indoor = RssiTrilateration::with_config(TrilaterationConfig {
            path_loss_exponent: 4.0,
            ..TrilaterationConfig::default()
        })
        .unwrap();
        assert!((indoor.estimate_distance(-80.0, -40.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_recovers_position_in_plane() {
        let tri = RssiTrilateration::new();
        let aps = vec![
            access_point("ap-1", 0.0, 0.0, 0.0, -40.0),
            access_point("ap-2", 10.0, 0.0, 0.0, -40.0),
            access_point("ap-3", 5.0, 10.0, 0.0, -40.0),
        ];
        let truth = Vector3::new(4.0, 3.0, 0.0);

        let position = tri.trilaterate(&aps, &measurements_for(&aps, truth)).expect("should converge");

        assert!((position.to_vector3() - truth).norm() < 0.1, "got {:?}", position);
        assert!(position.uncertainty < 1e-3);
        assert_eq!(position.confidence, LocationConfidence::High);
        assert_eq!(position.method, PositioningMethod::RssiTrilateration);
    }

    #[test]
    fn test_recovers_position_in_3d() {
        let tri = RssiTrilateration::new();
        let aps = vec![
            access_point("ap-1", 0.0, 0.0, 0.0, 20.0),
            access_point("ap-2", 12.0, 0.0, 0.0, 20.0),
            access_point("ap-3", 0.0, 12.0, 0.0, 20.0),
            access_point("ap-4", 0.0, 0.0, 6.0, 20.0),
        ];
        let truth = Vector3::new(3.0, 4.0, 1.5);

        let position = tri.trilaterate(&aps, &measurements_for(&aps, truth)).expect("should converge");

        assert!((position.to_vector3() - truth).norm() < 0.1, "got {:?}", position);
        assert!(position.uncertainty < 1e-3);
    }

    #[test]
    fn test_fewer_than_three_matches_returns_none() {
        let tri = RssiTrilateration::new();
        let aps = vec![
            access_point("ap-1", 0.0, 0.0, 0.0, -40.0),
            access_point("ap-2", 10.0, 0.0, 0.0, -40.0),
            access_point("ap-3", 5.0, 10.0, 0.0, -40.0),
        ];
        let measurements = vec![
            RssiMeasurement::new("ap-1", -55.0, 6, 2.437e9),
            RssiMeasurement::new("ap-2", -58.0, 6, 2.437e9),
            RssiMeasurement::new("unknown", -50.0, 6, 2.437e9),
        ];

        assert!(tri.trilaterate(&aps, &measurements).is_none());
        assert!(tri.trilaterate(&aps[..2], &measurements).is_none());
        assert!(tri.trilaterate(&aps, &measurements[..2]).is_none());
    }

    #[test]
    fn test_malformed_measurement_does_not_count_as_match() {
        let tri = RssiTrilateration::new();
        let aps = vec![
            access_point("ap-1", 0.0, 0.0, 0.0, -40.0),
            access_point("ap-2", 10.0, 0.0, 0.0, -40.0),
            access_point("ap-3", 5.0, 10.0, 0.0, -40.0),
        ];
        let mut measurements = measurements_for(&aps, Vector3::new(4.0, 3.0, 0.0));
        measurements[2].rssi = f64::NAN;

        assert!(tri.trilaterate(&aps, &measurements).is_none());
    }

    #[test]
    fn test_duplicate_bssid_uses_first_registration() {
        let tri = RssiTrilateration::new();
        let aps = vec![
            access_point("ap-1", 0.0, 0.0, 0.0, -40.0),
            access_point("ap-2", 10.0, 0.0, 0.0, -40.0),
            access_point("ap-3", 5.0, 10.0, 0.0, -40.0),
            access_point("ap-1", 100.0, 100.0, 0.0, -40.0),
        ];
        let truth = Vector3::new(6.0, 2.0, 0.0);
        let measurements = measurements_for(&aps[..3], truth);

        let position = tri.trilaterate(&aps, &measurements).unwrap();
        assert!((position.to_vector3() - truth).norm() < 0.1);
    }

    #[test]
    fn test_inconsistent_ranges_raise_uncertainty() {
        let tri = RssiTrilateration::new();
        let aps = vec![
            access_point("ap-1", 0.0, 0.0, 0.0, -40.0),
            access_point("ap-2", 10.0, 0.0, 0.0, -40.0),
            access_point("ap-3", 5.0, 10.0, 0.0, -40.0),
            access_point("ap-4", 5.0, 5.0, 0.0, -40.0),
        ];
        let mut measurements = measurements_for(&aps, Vector3::new(4.0, 3.0, 0.0));
        // ap-4 reports a range of 40 m instead of ~2.2 m
        measurements[3].rssi = synthetic_rssi(-40.0, 40.0, 2.0);

        let position = tri.trilaterate(&aps, &measurements).expect("should converge");
        assert!(position.uncertainty > 1.0);
        assert_eq!(position.confidence, LocationConfidence::from_uncertainty(position.uncertainty));
    }

    #[test]
    fn test_iteration_budget_exhausted_returns_none() {
        let tri = RssiTrilateration::with_config(TrilaterationConfig {
            max_iterations: 1,
            ..TrilaterationConfig::default()
        })
        .unwrap();
        let aps = vec![
            access_point("ap-1", 0.0, 0.0, 0.0, -40.0),
            access_point("ap-2", 10.0, 0.0, 0.0, -40.0),
            access_point("ap-3", 5.0, 10.0, 0.0, -40.0),
        ];
        let measurements = measurements_for(&aps, Vector3::new(8.0, 1.0, 0.0));

        assert!(tri.trilaterate(&aps, &measurements).is_none());
    }

    #[test]
    fn test_solver_starts_from_centroid_and_stays_in_bounds() {
        let tri = RssiTrilateration::new();
        let anchors = vec![
            (Vector3::new(0.0, 0.0, 0.0), 5.0),
            (Vector3::new(10.0, 0.0, 0.0), 5.0),
            (Vector3::new(5.0, 10.0, 0.0), 7.0),
        ];
        let outcome = tri.solve(&anchors);
        assert!(outcome.converged);
        assert!(outcome.estimate.x >= -7.0 && outcome.estimate.x <= 17.0);
        assert!(outcome.estimate.y >= -7.0 && outcome.estimate.y <= 17.0);
        assert!(outcome.estimate.z.abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrilaterationConfig {
            reference_distance: 0.0,
            ..TrilaterationConfig::default()
        };
        assert!(RssiTrilateration::with_config(config).is_err());
    }
}
