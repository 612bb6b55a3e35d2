//! Spatial and temporal analysis of accumulated positions

pub mod floor_plan;
pub mod movement;

pub use floor_plan::{
    coverage_area, FloorPlan, FloorPlanEdge, FloorPlanGenerator, FloorPlanMetadata, FloorPlanNode, NodeType,
    OccupancyGrid, Room,
};
pub use movement::{MovementAnalyzer, MovementClass, MovementPattern};
