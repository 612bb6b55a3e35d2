//! Aggregate result types exposed to monitoring consumers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{LocationConfidence, Position, PositioningMethod};
use crate::processing::coverage_area;

/// Summary of the accumulated position history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositioningStats {
    pub total_positions: usize,
    /// Mean uncertainty (meters)
    pub avg_accuracy: f64,
    /// Smallest uncertainty (meters)
    pub best_accuracy: f64,
    /// Largest uncertainty (meters)
    pub worst_accuracy: f64,
    /// Only confidence levels that occurred
    pub confidence_distribution: BTreeMap<LocationConfidence, usize>,
    /// Bounding-box area of the history (m²)
    pub coverage_area: f64,
    /// Every method, including those never used
    pub positioning_methods: BTreeMap<PositioningMethod, usize>,
}

impl PositioningStats {
    /// Summarize `positions`; the default (all zero) for an empty history
    pub fn from_positions(positions: &[Position]) -> Self {
        if positions.is_empty() {
            return Self::default();
        }

        let n = positions.len();
        let mut best = f64::INFINITY;
        let mut worst = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut confidence_distribution = BTreeMap::new();
        let mut positioning_methods: BTreeMap<PositioningMethod, usize> =
            PositioningMethod::ALL.iter().map(|m| (*m, 0)).collect();

        for p in positions {
            sum += p.uncertainty;
            best = best.min(p.uncertainty);
            worst = worst.max(p.uncertainty);
            *confidence_distribution.entry(p.confidence).or_insert(0) += 1;
            *positioning_methods.entry(p.method).or_insert(0) += 1;
        }

        Self {
            total_positions: n,
            avg_accuracy: sum / n as f64,
            best_accuracy: best,
            worst_accuracy: worst,
            confidence_distribution,
            coverage_area: coverage_area(positions),
            positioning_methods,
        }
    }
}
