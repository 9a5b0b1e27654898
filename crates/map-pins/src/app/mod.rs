//! Application module
//!
//! Drives a [`NavigationController`] the way a map page would:
//! - Load the position file for the initial viewport
//! - Step through the scripted zoom levels (each followed by the move event
//!   a real map fires after zooming)
//! - Apply the scripted pans, waiting out the settle delay between them
//! - Report the final counters and optionally dump the marker set as JSON

pub(crate) mod logging;
pub(crate) mod settings;
mod state;

use crate::app::settings::Settings;
use crate::app::state::{ConsoleNotifier, HeadlessMap};
use geo::Coord;
use map_pins_lib::{
    MapDisplay, NavigationController, PinTool, PinsError, PositionSource, RenderSummary,
};
use std::sync::Arc;
use std::time::Duration;

/// Errors that end a command-line run
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Pins(#[from] PinsError),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run one scripted session
pub async fn run(settings: Settings) -> Result<(), CliError> {
    let center = Coord {
        x: settings.center_lng,
        y: settings.center_lat,
    };
    let map = Arc::new(HeadlessMap::new(
        center,
        settings.zoom,
        settings.lat_span,
        settings.lng_span,
    ));
    let controller = NavigationController::new(
        map.clone(),
        Arc::new(ConsoleNotifier),
        settings.policies(),
        settings.controller_config(),
    );

    controller.set_source(PositionSource::File(settings.input.clone()));
    let report = controller.process_input().await?;
    tracing::info!(
        "Loaded {}: {} points, {} visible, {} markers",
        settings.input.display(),
        report.total,
        report.visible,
        report.displayed
    );

    for &zoom in &settings.zoom_steps {
        let center = map.bounds().center();
        map.set_view(center, zoom);
        log_pass(&format!("zoom {zoom}"), controller.on_zoom_changed(zoom).await);

        // Maps report a move after every zoom; it is expected to be ignored
        let bounds = map.bounds();
        log_pass("post-zoom move", controller.on_viewport_moved(bounds).await);
    }

    let settle = controller.config().settle_delay + Duration::from_millis(1);
    for &(d_lat, d_lng) in &settings.pans {
        let bounds = map.pan(d_lat, d_lng);
        log_pass(
            &format!("pan ({d_lat:+}, {d_lng:+})"),
            controller.on_viewport_moved(bounds).await,
        );
        tokio::time::sleep(settle).await;
    }

    let stats = controller.stats();
    tracing::info!(
        "Final view at zoom {}: {} total, {} visible, {} markers",
        map.zoom(),
        stats.total,
        stats.visible,
        stats.displayed
    );

    if let Some(path) = &settings.output {
        let json = serde_json::to_string_pretty(&map.snapshot(stats))?;
        tokio::fs::write(path, json).await?;
        tracing::info!("Wrote {} markers to {}", map.marker_count(), path.display());
    }

    Ok(())
}

fn log_pass(event: &str, summary: Option<RenderSummary>) {
    match summary {
        Some(summary) => tracing::info!(
            "{event}: {} markers ({} failed{})",
            summary.displayed,
            summary.failed,
            if summary.cancelled { ", superseded" } else { "" }
        ),
        None => tracing::debug!("{event}: ignored"),
    }
}
