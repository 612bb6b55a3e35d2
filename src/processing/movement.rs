use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::core::{Position, RUNNING_MAX_VELOCITY_MS, WALKING_MAX_VELOCITY_MS};
use crate::utils::config::MovementConfig;
use crate::validation::GeoResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementClass {
    Stationary,
    Walking,
    Running,
    Vehicle,
}

/// Motion summary over the retained position window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementPattern {
    pub path: Vec<Position>,
    /// Mean step speed (m/s)
    pub velocity: f64,
    /// Bearing from first to last position, degrees counter-clockwise from +x
    pub direction: f64,
    /// Seconds between first and last position
    pub duration: f64,
    pub classification: MovementClass,
}

/// Classifies device motion from a bounded FIFO of recent positions
#[derive(Debug, Clone)]
pub struct MovementAnalyzer {
    config: MovementConfig,
    history: VecDeque<Position>,
}

impl Default for MovementAnalyzer {
    fn default() -> Self {
        Self {
            config: MovementConfig::default(),
            history: VecDeque::with_capacity(MovementConfig::default().history_capacity),
        }
    }
}

impl MovementAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MovementConfig) -> GeoResult<Self> {
        config.validate()?;
        Ok(Self {
            history: VecDeque::with_capacity(config.history_capacity),
            config,
        })
    }

    /// Append a position, evicting the oldest beyond capacity
    pub fn add_position(&mut self, position: Position) {
        self.history.push_back(position);
        while self.history.len() > self.config.history_capacity {
            self.history.pop_front();
        }
    }

    pub fn classify_velocity(&self, velocity: f64) -> MovementClass {
        if velocity < self.config.velocity_threshold {
            MovementClass::Stationary
        } else if velocity < WALKING_MAX_VELOCITY_MS {
            MovementClass::Walking
        } else if velocity < RUNNING_MAX_VELOCITY_MS {
            MovementClass::Running
        } else {
            MovementClass::Vehicle
        }
    }

    /// Summarize the whole window as a single pattern.
    ///
    /// Empty when fewer than two positions are retained or no consecutive pair
    /// has a positive time step.
    pub fn analyze_movement(&self) -> Vec<MovementPattern> {
        if self.history.len() < 2 {
            return Vec::new();
        }

        let velocities: Vec<f64> = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .filter_map(|(prev, next)| {
                let elapsed = next.seconds_since(prev);
                (elapsed > 0.0).then(|| next.distance_to(prev) / elapsed)
            })
            .collect();

        if velocities.is_empty() {
            debug!(positions = self.history.len(), "no positive time steps in movement window");
            return Vec::new();
        }

        let velocity = velocities.iter().sum::<f64>() / velocities.len() as f64;

        let (first, last) = match (self.history.front(), self.history.back()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Vec::new(),
        };
        let direction = (last.y - first.y).atan2(last.x - first.x).to_degrees();
        let classification = self.classify_velocity(velocity);

        debug!(velocity, direction, ?classification, steps = velocities.len(), "movement analyzed");

        vec![MovementPattern {
            path: self.history.iter().cloned().collect(),
            velocity,
            direction,
            duration: last.seconds_since(first),
            classification,
        }]
    }

    pub fn history(&self) -> impl Iterator<Item = &Position> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
