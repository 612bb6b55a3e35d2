use geointel::{
    AccessPointLocation, GeospatialIntelligence, JsonFormatter, LocationConfidence, PlatformConfig, Position,
    PositioningMethod, RssiMeasurement,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn access_point(bssid: &str, ssid: &str, x: f64, y: f64) -> AccessPointLocation {
    AccessPointLocation {
        bssid: bssid.to_string(),
        ssid: ssid.to_string(),
        position: Position::new(x, y, 3.0, 0.5, LocationConfidence::High, PositioningMethod::RssiTrilateration),
        tx_power: 20.0,
        antenna_gain: 2.0,
        frequency: 2.4e9,
    }
}

fn scan(offset_db: f64) -> Vec<RssiMeasurement> {
    vec![
        RssiMeasurement::new("00:11:22:33:44:55", -45.0 - offset_db, 6, 2.437e9),
        RssiMeasurement::new("00:11:22:33:44:66", -55.0 - offset_db, 11, 2.462e9),
        RssiMeasurement::new("00:11:22:33:44:77", -50.0 - offset_db, 1, 2.412e9),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.len() {
        1 => PlatformConfig::default(),
        2 => PlatformConfig::load_from_file(&args[1])?,
        _ => {
            eprintln!("Usage: {} [config.json]", args.first().map_or("geointel-demo", |s| s.as_str()));
            return Err("Invalid arguments".into());
        }
    };

    let mut geo = GeospatialIntelligence::with_config(config)?;
    geo.add_access_point(access_point("00:11:22:33:44:55", "TestAP1", 0.0, 0.0));
    geo.add_access_point(access_point("00:11:22:33:44:66", "TestAP2", 10.0, 0.0));
    geo.add_access_point(access_point("00:11:22:33:44:77", "TestAP3", 5.0, 10.0));

    let formatter = JsonFormatter::pretty();

    match geo.estimate_position(&scan(0.0)) {
        Some(position) => info!(
            x = position.x,
            y = position.y,
            z = position.z,
            uncertainty = position.uncertainty,
            confidence = position.confidence.as_str(),
            method = position.method.as_str(),
            "estimated position"
        ),
        None => warn!("no position estimate from initial scan"),
    }

    let training = Position::new(5.0, 5.0, 0.0, 1.0, LocationConfidence::High, PositioningMethod::Fingerprinting);
    geo.train_fingerprinting("location_1", training, &scan(0.0));

    for step in 0..5 {
        if geo.estimate_position(&scan(step as f64)).is_none() {
            warn!(step, "no position estimate");
        }
    }

    let patterns = geo.analyze_movement_patterns();
    info!(count = patterns.len(), "movement patterns detected");
    for pattern in &patterns {
        info!(
            classification = ?pattern.classification,
            velocity = pattern.velocity,
            duration = pattern.duration,
            "movement pattern"
        );
    }

    let floor_plan = geo.generate_floor_plan()?;
    info!(
        nodes = floor_plan.nodes.len(),
        edges = floor_plan.edges.len(),
        rooms = floor_plan.rooms.len(),
        "floor plan generated"
    );

    println!("{}", formatter.format(&geo.get_positioning_stats())?);
    Ok(())
}
