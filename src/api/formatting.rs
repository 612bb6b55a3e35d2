//! JSON export of platform outputs

use serde::Serialize;

/// Serializes positions, floor plans, movement patterns and stats
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PositioningStats;
    use crate::core::{LocationConfidence, Position, PositioningMethod};
    use crate::processing::FloorPlanGenerator;
    use serde_json::Value;

    #[test]
    fn test_position_json_fields() {
        let p = Position::new(1.5, -2.0, 0.0, 0.75, LocationConfidence::High, PositioningMethod::Fingerprinting);
        let json = JsonFormatter::new().format(&p).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["x"], 1.5);
        assert_eq!(value["confidence"], "high");
        assert_eq!(value["method"], "fingerprinting");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_stats_maps_use_string_keys() {
        let positions = vec![Position::new(0.0, 0.0, 0.0, 1.0, LocationConfidence::High, PositioningMethod::RssiTrilateration)];
        let json = JsonFormatter::pretty().format(&PositioningStats::from_positions(&positions)).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["confidence_distribution"]["high"], 1);
        assert_eq!(value["positioning_methods"]["rssi_trilateration"], 1);
        assert_eq!(value["positioning_methods"]["dead_reckoning"], 0);
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_floor_plan_serializes() {
        let plan = FloorPlanGenerator::new().generate_floor_plan(&[], &[]).unwrap();
        let json = JsonFormatter::new().format(&plan).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rooms"].as_array().unwrap().len(), 0);
        assert_eq!(value["metadata"]["num_positions"], 0);
    }
}
