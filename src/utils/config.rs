use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::core::constants::*;
use crate::validation::error::{ensure_positive, GeoError, GeoResult};

/// Path-loss model and solver parameters for RSSI trilateration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrilaterationConfig {
    /// Log-distance path-loss exponent (2.0 = free space)
    pub path_loss_exponent: f64,
    /// Distance at which tx_power is assumed to be received (meters)
    pub reference_distance: f64,
    /// Nominal RSSI at the reference distance (dBm); not used in distance math
    pub reference_rssi: f64,
    /// Maximum Levenberg-Marquardt iterations per solve
    pub max_iterations: usize,
    /// Relative cost-change tolerance for convergence
    pub cost_tolerance: f64,
    /// Gradient-norm tolerance for convergence
    pub gradient_tolerance: f64,
}

/// Occupancy grid parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlanConfig {
    /// Edge length of one grid cell (meters)
    pub grid_resolution: f64,
    /// Upper bound on width x height of the occupancy grid
    pub max_grid_cells: usize,
}

/// Movement classification parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Mean speed below which the window is stationary (m/s)
    pub velocity_threshold: f64,
    /// Number of positions retained
    pub history_capacity: usize,
}

/// Platform-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub trilateration: TrilaterationConfig,
    pub floor_plan: FloorPlanConfig,
    pub movement: MovementConfig,
    /// Registered access points needed before trilateration is attempted
    pub min_access_points: usize,
}

impl Default for TrilaterationConfig {
    fn default() -> Self {
        Self {
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
            reference_distance: REFERENCE_DISTANCE_M,
            reference_rssi: DEFAULT_REFERENCE_RSSI_DBM,
            max_iterations: 200,
            cost_tolerance: 1e-12,
            gradient_tolerance: 1e-9,
        }
    }
}

impl Default for FloorPlanConfig {
    fn default() -> Self {
        Self {
            grid_resolution: DEFAULT_GRID_RESOLUTION_M,
            max_grid_cells: DEFAULT_MAX_GRID_CELLS,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD_MS,
            history_capacity: MOVEMENT_HISTORY_CAPACITY,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            trilateration: TrilaterationConfig::default(),
            floor_plan: FloorPlanConfig::default(),
            movement: MovementConfig::default(),
            min_access_points: MIN_REFERENCE_POINTS,
        }
    }
}

impl TrilaterationConfig {
    pub fn validate(&self) -> GeoResult<()> {
        ensure_positive("path_loss_exponent", self.path_loss_exponent)?;
        ensure_positive("reference_distance", self.reference_distance)?;
        ensure_positive("cost_tolerance", self.cost_tolerance)?;
        ensure_positive("gradient_tolerance", self.gradient_tolerance)?;
        if self.max_iterations == 0 {
            return Err(GeoError::invalid_parameter("max_iterations", 0, "at least one iteration is required"));
        }
        Ok(())
    }
}

impl FloorPlanConfig {
    pub fn validate(&self) -> GeoResult<()> {
        ensure_positive("grid_resolution", self.grid_resolution)?;
        if self.max_grid_cells == 0 {
            return Err(GeoError::invalid_parameter("max_grid_cells", 0, "grid must hold at least one cell"));
        }
        Ok(())
    }
}

impl MovementConfig {
    pub fn validate(&self) -> GeoResult<()> {
        ensure_positive("velocity_threshold", self.velocity_threshold)?;
        if self.velocity_threshold >= WALKING_MAX_VELOCITY_MS {
            return Err(GeoError::invalid_parameter(
                "velocity_threshold",
                self.velocity_threshold,
                format!("must be below the walking limit of {} m/s", WALKING_MAX_VELOCITY_MS),
            ));
        }
        if self.history_capacity < 2 {
            return Err(GeoError::invalid_parameter(
                "history_capacity",
                self.history_capacity,
                "at least two positions are needed to measure movement",
            ));
        }
        Ok(())
    }
}

impl PlatformConfig {
    /// Validate every section
    pub fn validate(&self) -> GeoResult<()> {
        self.trilateration.validate()?;
        self.floor_plan.validate()?;
        self.movement.validate()?;
        if self.min_access_points < MIN_REFERENCE_POINTS {
            return Err(GeoError::invalid_parameter(
                "min_access_points",
                self.min_access_points,
                format!("trilateration needs at least {} access points", MIN_REFERENCE_POINTS),
            ));
        }
        Ok(())
    }

    /// Load and validate configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GeoResult<Self> {
        let content = fs::read_to_string(&path)?;
        let config: PlatformConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = %path.as_ref().display(), "loaded platform configuration");
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> GeoResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}
