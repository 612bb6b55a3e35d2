//! Model parameters and classification thresholds

/// Distance at which the path-loss model is anchored (meters)
pub const REFERENCE_DISTANCE_M: f64 = 1.0;

/// Free-space path-loss exponent
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.0;

/// Nominal RSSI at the reference distance (dBm). Documentary only.
pub const DEFAULT_REFERENCE_RSSI_DBM: f64 = -40.0;

/// Minimum matched access points / common fingerprint APs for a fix
pub const MIN_REFERENCE_POINTS: usize = 3;

/// Trilateration uncertainty below which a fix is HIGH confidence (meters)
pub const HIGH_CONFIDENCE_UNCERTAINTY_M: f64 = 2.0;
/// Trilateration uncertainty below which a fix is MEDIUM confidence (meters)
pub const MEDIUM_CONFIDENCE_UNCERTAINTY_M: f64 = 5.0;

/// Fingerprint match score below which a fix is HIGH confidence (dB²)
pub const HIGH_CONFIDENCE_MATCH_SCORE: f64 = 25.0;
/// Fingerprint match score below which a fix is MEDIUM confidence (dB²)
pub const MEDIUM_CONFIDENCE_MATCH_SCORE: f64 = 100.0;

pub const DEFAULT_GRID_RESOLUTION_M: f64 = 1.0;
/// Largest occupancy grid allocated for one floor plan (cells)
pub const DEFAULT_MAX_GRID_CELLS: usize = 4_000_000;
/// Components with this many cells or fewer are not rooms
pub const MIN_ROOM_CELLS: usize = 4;
/// Rooms whose centres are closer than this are linked (meters)
pub const ROOM_LINK_DISTANCE_M: f64 = 20.0;
/// Occupancy percentile used as the room threshold
pub const OCCUPANCY_PERCENTILE: f64 = 50.0;

/// Mean speed below which the device is stationary (m/s)
pub const DEFAULT_VELOCITY_THRESHOLD_MS: f64 = 0.5;
pub const WALKING_MAX_VELOCITY_MS: f64 = 2.0;
pub const RUNNING_MAX_VELOCITY_MS: f64 = 5.0;
/// Positions retained by the movement analyzer
pub const MOVEMENT_HISTORY_CAPACITY: usize = 100;
