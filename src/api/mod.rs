//! Platform entry point and exported result types

pub mod intelligence;
pub mod types;
pub mod formatting;

pub use intelligence::GeospatialIntelligence;
pub use types::PositioningStats;
pub use formatting::JsonFormatter;
