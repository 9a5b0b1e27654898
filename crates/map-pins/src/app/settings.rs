use clap::Parser;
use map_pins_lib::{ControllerConfig, DEFAULT_MOVE_TOLERANCE_DEG, ZoomPolicyTable};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Map Pins - Replay map navigation over a position dump and report the rendered markers
pub struct Settings {
    /// Position text file (`position: [lng, lat]`, `name: '...'`, `time: '...'`)
    #[clap(value_name = "FILE")]
    pub input: PathBuf,

    /// Initial zoom level
    #[clap(short, long, default_value = "10")]
    pub zoom: i32,

    /// Latitude of the initial viewport centre
    #[clap(long, default_value = "39.9042", allow_hyphen_values = true)]
    pub center_lat: f64,

    /// Longitude of the initial viewport centre
    #[clap(long, default_value = "116.4074", allow_hyphen_values = true)]
    pub center_lng: f64,

    /// Viewport height in degrees at the initial zoom
    #[clap(long, default_value = "1.0")]
    pub lat_span: f64,

    /// Viewport width in degrees at the initial zoom
    #[clap(long, default_value = "1.0")]
    pub lng_span: f64,

    /// Zoom levels to step through after loading, in order
    #[clap(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub zoom_steps: Vec<i32>,

    /// Pans to apply after the zoom steps, as `DLAT,DLNG` in degrees (repeatable)
    #[clap(long = "pan", value_name = "DLAT,DLNG", value_parser = parse_pan, allow_hyphen_values = true)]
    pub pans: Vec<(f64, f64)>,

    /// Pins added per render batch
    #[clap(long, default_value = "100")]
    pub batch_size: usize,

    /// Pause between render batches in milliseconds
    #[clap(long, default_value = "10")]
    pub batch_pause_ms: u64,

    /// Minimum viewport edge change in degrees before a pan reclusters
    #[clap(long, default_value_t = DEFAULT_MOVE_TOLERANCE_DEG)]
    pub move_tolerance: f64,

    /// How long a pan blocks further pans, in milliseconds
    #[clap(long, default_value = "100")]
    pub settle_ms: u64,

    /// Multiply every zoom level's cluster threshold by this factor
    #[clap(long, default_value = "1.0")]
    pub threshold_scale: f64,

    /// Write the final marker set as JSON to this file
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            batch_size: self.batch_size,
            batch_pause: Duration::from_millis(self.batch_pause_ms),
            move_tolerance: self.move_tolerance,
            settle_delay: Duration::from_millis(self.settle_ms),
            initial_zoom: self.zoom,
            ..ControllerConfig::default()
        }
    }

    pub fn policies(&self) -> ZoomPolicyTable {
        let table = ZoomPolicyTable::default();
        if (self.threshold_scale - 1.0).abs() < f64::EPSILON {
            table
        } else {
            table.with_threshold_scale(self.threshold_scale)
        }
    }
}

/// Parse a `DLAT,DLNG` pair
fn parse_pan(value: &str) -> Result<(f64, f64), String> {
    let (d_lat, d_lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected DLAT,DLNG, got '{value}'"))?;
    let d_lat = d_lat
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid latitude delta '{d_lat}': {e}"))?;
    let d_lng = d_lng
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid longitude delta '{d_lng}': {e}"))?;
    Ok((d_lat, d_lng))
}
