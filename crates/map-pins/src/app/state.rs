//! Headless collaborators for the navigation controller
//!
//! [`HeadlessMap`] stands in for a map widget: it tracks a camera (centre,
//! zoom and the visible span) and keeps every marker it is asked to draw so
//! the final set can be inspected or dumped. [`ConsoleNotifier`] forwards user
//! feedback to the log.

use geo::Coord;
use map_pins_lib::{
    BadgeStyle, Cluster, MapDisplay, MarkerId, Notifier, NotifyLevel, PinPoint, RenderStats,
    Result, ViewportBounds,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One marker as drawn on the headless map
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerRecord {
    Pin {
        name: String,
        latitude: f64,
        longitude: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        source_index: usize,
    },
    Cluster {
        count: usize,
        latitude: f64,
        longitude: f64,
        size_px: f32,
        font_px: f32,
    },
}

/// Snapshot of the headless map written as the JSON report
#[derive(Clone, Debug, serde::Serialize)]
pub struct MapSnapshot {
    pub zoom: i32,
    pub bounds: ViewportBounds,
    pub stats: RenderStats,
    pub markers: Vec<MarkerRecord>,
}

#[derive(Debug)]
struct Camera {
    center: Coord<f64>,
    zoom: i32,
    lat_span: f64,
    lng_span: f64,
}

#[derive(Debug)]
struct HeadlessState {
    camera: Camera,
    next_id: u64,
    markers: BTreeMap<u64, MarkerRecord>,
}

/// In-memory map used by the command-line driver
#[derive(Debug)]
pub struct HeadlessMap {
    state: Mutex<HeadlessState>,
}

impl HeadlessMap {
    /// Create a map showing `lat_span` x `lng_span` degrees around `center`
    pub fn new(center: Coord<f64>, zoom: i32, lat_span: f64, lng_span: f64) -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                camera: Camera {
                    center,
                    zoom,
                    lat_span,
                    lng_span,
                },
                next_id: 0,
                markers: BTreeMap::new(),
            }),
        }
    }

    /// Move the camera by the given deltas, keeping the zoom
    pub fn pan(&self, d_lat: f64, d_lng: f64) -> ViewportBounds {
        let mut state = self.lock_state();
        state.camera.center.y += d_lat;
        state.camera.center.x += d_lng;
        bounds_of(&state.camera)
    }

    pub fn marker_count(&self) -> usize {
        self.lock_state().markers.len()
    }

    /// Current camera and markers, in insertion order
    pub fn snapshot(&self, stats: RenderStats) -> MapSnapshot {
        let state = self.lock_state();
        MapSnapshot {
            zoom: state.camera.zoom,
            bounds: bounds_of(&state.camera),
            stats,
            markers: state.markers.values().cloned().collect(),
        }
    }

    fn insert(&self, record: MarkerRecord) -> MarkerId {
        let mut state = self.lock_state();
        state.next_id += 1;
        let id = state.next_id;
        state.markers.insert(id, record);
        MarkerId(id)
    }

    fn lock_state(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn bounds_of(camera: &Camera) -> ViewportBounds {
    ViewportBounds::around(camera.center, camera.lat_span, camera.lng_span)
}

impl MapDisplay for HeadlessMap {
    fn is_ready(&self) -> bool {
        true
    }

    fn bounds(&self) -> ViewportBounds {
        bounds_of(&self.lock_state().camera)
    }

    fn zoom(&self) -> i32 {
        self.lock_state().camera.zoom
    }

    /// Each zoom level in halves the visible span, each level out doubles it
    fn set_view(&self, center: Coord<f64>, zoom: i32) {
        let mut state = self.lock_state();
        let camera = &mut state.camera;
        let factor = 2f64.powi(camera.zoom - zoom);
        camera.lat_span *= factor;
        camera.lng_span *= factor;
        camera.center = center;
        camera.zoom = zoom;
    }

    fn add_pin(&self, point: &PinPoint) -> Result<MarkerId> {
        Ok(self.insert(MarkerRecord::Pin {
            name: point.name().to_string(),
            latitude: point.latitude(),
            longitude: point.longitude(),
            timestamp: point.timestamp().map(str::to_string),
            source_index: point.source_index(),
        }))
    }

    fn add_cluster(&self, cluster: &Cluster, style: BadgeStyle) -> Result<MarkerId> {
        Ok(self.insert(MarkerRecord::Cluster {
            count: cluster.count(),
            latitude: cluster.centroid_lat(),
            longitude: cluster.centroid_lng(),
            size_px: style.size_px,
            font_px: style.font_px,
        }))
    }

    fn remove_marker(&self, id: MarkerId) {
        self.lock_state().markers.remove(&id.0);
    }
}

/// Notifier that writes user feedback to the log
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Info | NotifyLevel::Success => tracing::info!("{message}"),
            NotifyLevel::Warning => tracing::warn!("{message}"),
            NotifyLevel::Error => tracing::error!("{message}"),
        }
    }

    fn set_status(&self, message: &str, level: NotifyLevel) {
        tracing::debug!(?level, "Status: {message}");
    }

    fn publish_stats(&self, stats: RenderStats) {
        tracing::trace!(
            total = stats.total,
            visible = stats.visible,
            displayed = stats.displayed,
            "Stats"
        );
    }
}
