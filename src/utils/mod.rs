//! Configuration

pub mod config;

pub use config::{FloorPlanConfig, MovementConfig, PlatformConfig, TrilaterationConfig};
