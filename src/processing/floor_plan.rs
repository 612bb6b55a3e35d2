//! Floor-plan synthesis from accumulated position density.
//!
//! Pipeline: occupancy grid -> rooms (connected components of dense cells)
//! -> room connectivity graph -> metadata. Room detection uses position
//! density only; per-position RSSI batches feed the confidence score and
//! nothing else.

use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::core::{
    LocationConfidence, Position, PositioningMethod, RssiMeasurement, MIN_ROOM_CELLS, OCCUPANCY_PERCENTILE,
    ROOM_LINK_DISTANCE_M,
};
use crate::utils::config::FloorPlanConfig;
use crate::validation::{GeoError, GeoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Room,
    Corridor,
    Junction,
    Entrance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlanNode {
    pub id: String,
    pub position: Position,
    pub node_type: NodeType,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlanEdge {
    pub from_node: String,
    pub to_node: String,
    /// Centre-to-centre distance (meters)
    pub distance: f64,
    pub traversable: bool,
    pub properties: Map<String, Value>,
}

/// Room derived from one connected region of dense grid cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    /// Axis-aligned bounding-box corners (x, y), counter-clockwise from the minimum corner
    pub corners: Vec<(f64, f64)>,
    /// Mean (x, y) of the room's cells
    pub center: (f64, f64),
    /// Square meters
    pub area: f64,
    pub floor_level: i32,
}

/// 2D histogram of positions.
///
/// `counts[(row, col)]` covers x in `[origin_x + col*res, origin_x + (col+1)*res)`
/// and likewise rows in y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    pub origin_x: f64,
    pub origin_y: f64,
    pub resolution: f64,
    pub counts: DMatrix<u32>,
}

impl OccupancyGrid {
    pub fn empty(resolution: f64) -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            resolution,
            counts: DMatrix::zeros(0, 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn width(&self) -> usize {
        self.counts.ncols()
    }

    pub fn height(&self) -> usize {
        self.counts.nrows()
    }

    fn cell_x(&self, col: f64) -> f64 {
        self.origin_x + col * self.resolution
    }

    fn cell_y(&self, row: f64) -> f64 {
        self.origin_y + row * self.resolution
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlanMetadata {
    pub generated_at: DateTime<Utc>,
    pub num_positions: usize,
    /// Bounding-box area of the input positions (m²)
    pub coverage_area: f64,
    /// 0.0 to 1.0
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlan {
    pub nodes: Vec<FloorPlanNode>,
    pub edges: Vec<FloorPlanEdge>,
    pub rooms: Vec<Room>,
    pub grid: OccupancyGrid,
    pub metadata: FloorPlanMetadata,
}

/// Axis-aligned bounding-box area of the x/y spread; 0 for fewer than 3 positions
pub fn coverage_area(positions: &[Position]) -> f64 {
    if positions.len() < 3 {
        return 0.0;
    }
    let (min_x, max_x, min_y, max_y) = positions.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, max_x, min_y, max_y), p| (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y)),
    );
    (max_x - min_x) * (max_y - min_y)
}

/// Linear-interpolated percentile of already sorted values
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = pct / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FloorPlanGenerator {
    config: FloorPlanConfig,
}

impl FloorPlanGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FloorPlanConfig) -> GeoResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn grid_resolution(&self) -> f64 {
        self.config.grid_resolution
    }

    /// Build a floor plan from positions and, optionally, the RSSI batch
    /// observed at each position.
    ///
    /// `rssi_by_position` may be empty; otherwise it must have one batch per
    /// position.
    pub fn generate_floor_plan(
        &self,
        positions: &[Position],
        rssi_by_position: &[Vec<RssiMeasurement>],
    ) -> GeoResult<FloorPlan> {
        if !rssi_by_position.is_empty() && rssi_by_position.len() != positions.len() {
            return Err(GeoError::LengthMismatch {
                what: "rssi batches per position",
                expected: positions.len(),
                actual: rssi_by_position.len(),
            });
        }

        let grid = self.create_spatial_grid(positions)?;
        let rooms = self.identify_rooms(&grid);
        let (nodes, edges) = self.generate_connectivity_graph(&rooms);

        let metadata = FloorPlanMetadata {
            generated_at: Utc::now(),
            num_positions: positions.len(),
            coverage_area: coverage_area(positions),
            confidence: self.calculate_plan_confidence(positions, rssi_by_position),
        };

        info!(
            positions = positions.len(),
            rooms = rooms.len(),
            edges = edges.len(),
            confidence = metadata.confidence,
            "floor plan generated"
        );

        Ok(FloorPlan {
            nodes,
            edges,
            rooms,
            grid,
            metadata,
        })
    }

    /// Count positions per grid cell over their bounding box.
    ///
    /// Fails if the bounding box needs more than `max_grid_cells` cells.
    pub fn create_spatial_grid(&self, positions: &[Position]) -> GeoResult<OccupancyGrid> {
        let resolution = self.config.grid_resolution;
        let points: Vec<(f64, f64)> = positions
            .iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .map(|p| (p.x, p.y))
            .collect();

        if points.is_empty() {
            return Ok(OccupancyGrid::empty(resolution));
        }

        let (min_x, max_x, min_y, max_y) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(min_x, max_x, min_y, max_y), &(x, y)| (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y)),
        );

        let (width, height) = self.grid_dimensions(max_x - min_x, max_y - min_y)?;
        let mut counts = DMatrix::<u32>::zeros(height, width);

        for (x, y) in points {
            let col = ((x - min_x) / resolution) as usize;
            let row = ((y - min_y) / resolution) as usize;
            if col < width && row < height {
                counts[(row, col)] += 1;
            }
        }

        Ok(OccupancyGrid {
            origin_x: min_x,
            origin_y: min_y,
            resolution,
            counts,
        })
    }

    /// Cells needed along x and y to cover the given spans
    fn grid_dimensions(&self, span_x: f64, span_y: f64) -> GeoResult<(usize, usize)> {
        let resolution = self.config.grid_resolution;
        let limit = self.config.max_grid_cells;
        let too_large = || {
            GeoError::invalid_parameter(
                "grid_span",
                format!("{} x {} m", span_x, span_y),
                format!("occupancy grid would exceed max_grid_cells = {}", limit),
            )
        };
        let cells_along = |span: f64| {
            let cells = (span / resolution).floor() + 1.0;
            (cells.is_finite() && cells <= limit as f64).then_some(cells as usize)
        };

        let width = cells_along(span_x).ok_or_else(too_large)?;
        let height = cells_along(span_y).ok_or_else(too_large)?;
        match width.checked_mul(height) {
            Some(cells) if cells <= limit => Ok((width, height)),
            _ => Err(too_large()),
        }
    }

    /// Rooms are 4-connected regions of cells denser than the median
    /// non-empty cell, larger than [`MIN_ROOM_CELLS`].
    pub fn identify_rooms(&self, grid: &OccupancyGrid) -> Vec<Room> {
        if grid.is_empty() {
            return Vec::new();
        }

        let mut nonzero: Vec<f64> = grid.counts.iter().filter(|&&c| c > 0).map(|&c| c as f64).collect();
        if nonzero.is_empty() {
            return Vec::new();
        }
        nonzero.sort_by(|a, b| a.total_cmp(b));
        let threshold = percentile(&nonzero, OCCUPANCY_PERCENTILE);

        let (rows, cols) = grid.counts.shape();
        let occupied = grid.counts.map(|c| (c as f64) > threshold);
        let mut labels = DMatrix::<usize>::zeros(rows, cols);
        let mut next_label = 0usize;
        let mut rooms = Vec::new();

        // Row-major scan so labels follow raster order
        for row in 0..rows {
            for col in 0..cols {
                if !occupied[(row, col)] || labels[(row, col)] != 0 {
                    continue;
                }
                next_label += 1;
                let cells = flood_fill(&occupied, &mut labels, (row, col), next_label);

                if cells.len() > MIN_ROOM_CELLS {
                    rooms.push(self.room_from_cells(grid, next_label, &cells));
                } else {
                    debug!(label = next_label, cells = cells.len(), "discarding small component");
                }
            }
        }

        debug!(threshold, components = next_label, rooms = rooms.len(), "rooms identified");
        rooms
    }

    fn room_from_cells(&self, grid: &OccupancyGrid, label: usize, cells: &[(usize, usize)]) -> Room {
        let (mut min_r, mut max_r, mut min_c, mut max_c) = (usize::MAX, 0, usize::MAX, 0);
        let (mut sum_r, mut sum_c) = (0.0, 0.0);
        for &(r, c) in cells {
            min_r = min_r.min(r);
            max_r = max_r.max(r);
            min_c = min_c.min(c);
            max_c = max_c.max(c);
            sum_r += r as f64;
            sum_c += c as f64;
        }
        let n = cells.len() as f64;

        let (x0, x1) = (grid.cell_x(min_c as f64), grid.cell_x(max_c as f64));
        let (y0, y1) = (grid.cell_y(min_r as f64), grid.cell_y(max_r as f64));

        Room {
            id: format!("room_{}", label),
            name: format!("Room {}", label),
            corners: vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
            center: (grid.cell_x(sum_c / n), grid.cell_y(sum_r / n)),
            area: n * grid.resolution * grid.resolution,
            floor_level: 0,
        }
    }

    /// One node per room; an edge between every pair of rooms whose centres
    /// are closer than [`ROOM_LINK_DISTANCE_M`]. Proximity only, no line of
    /// sight check.
    pub fn generate_connectivity_graph(&self, rooms: &[Room]) -> (Vec<FloorPlanNode>, Vec<FloorPlanEdge>) {
        let nodes = rooms
            .iter()
            .map(|room| {
                let mut properties = Map::new();
                properties.insert("area".to_string(), json!(room.area));
                properties.insert("name".to_string(), json!(room.name));
                FloorPlanNode {
                    id: room.id.clone(),
                    position: Position::new(
                        room.center.0,
                        room.center.1,
                        0.0,
                        0.0,
                        LocationConfidence::High,
                        PositioningMethod::Hybrid,
                    ),
                    node_type: NodeType::Room,
                    properties,
                }
            })
            .collect();

        let mut edges = Vec::new();
        for (i, a) in rooms.iter().enumerate() {
            for b in &rooms[i + 1..] {
                let distance = ((a.center.0 - b.center.0).powi(2) + (a.center.1 - b.center.1).powi(2)).sqrt();
                if distance < ROOM_LINK_DISTANCE_M {
                    edges.push(FloorPlanEdge {
                        from_node: a.id.clone(),
                        to_node: b.id.clone(),
                        distance,
                        traversable: true,
                        properties: Map::new(),
                    });
                }
            }
        }

        (nodes, edges)
    }

    /// Mean of an accuracy score and an RSSI batch density score, 0.0 to 1.0
    pub fn calculate_plan_confidence(&self, positions: &[Position], rssi_by_position: &[Vec<RssiMeasurement>]) -> f64 {
        if positions.is_empty() {
            return 0.0;
        }
        let n = positions.len() as f64;
        let mean_uncertainty = positions.iter().map(|p| p.uncertainty).sum::<f64>() / n;
        let batches_per_position = rssi_by_position.len() as f64 / n;

        let uncertainty_score = (1.0 - mean_uncertainty / 10.0).max(0.0);
        let density_score = (batches_per_position / 5.0).min(1.0);
        (uncertainty_score + density_score) / 2.0
    }
}

fn flood_fill(
    occupied: &DMatrix<bool>,
    labels: &mut DMatrix<usize>,
    seed: (usize, usize),
    label: usize,
) -> Vec<(usize, usize)> {
    let (rows, cols) = occupied.shape();
    let mut cells = Vec::new();
    let mut queue = VecDeque::from([seed]);
    labels[seed] = label;

    while let Some((r, c)) = queue.pop_front() {
        cells.push((r, c));
        let neighbours = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in neighbours {
            if nr < rows && nc < cols && occupied[(nr, nc)] && labels[(nr, nc)] == 0 {
                labels[(nr, nc)] = label;
                queue.push_back((nr, nc));
            }
        }
    }

    cells
}
