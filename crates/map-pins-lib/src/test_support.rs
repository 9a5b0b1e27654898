//! In-memory map and notifier doubles shared by the unit tests

use crate::{
    BadgeStyle, Cluster, MapDisplay, MarkerId, Notifier, NotifyLevel, PinPoint, PinsError,
    RenderStats, Result, ViewportBounds,
};
use geo::Coord;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub(crate) fn create_test_point(lat: f64, lng: f64, index: usize) -> PinPoint {
    PinPoint::new(lat, lng, format!("p{index}"), None, index).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FakeMarker {
    Pin(usize),
    Cluster(usize),
}

#[derive(Debug)]
struct FakeMapState {
    ready: bool,
    bounds: ViewportBounds,
    zoom: i32,
    next_id: u64,
    markers: BTreeMap<u64, FakeMarker>,
    removed: usize,
    fail_on_name: Option<String>,
}

/// Map double that records markers instead of drawing them
#[derive(Debug)]
pub(crate) struct FakeMap {
    state: Mutex<FakeMapState>,
}

impl FakeMap {
    pub(crate) fn ready() -> Self {
        Self {
            state: Mutex::new(FakeMapState {
                ready: true,
                bounds: ViewportBounds::new(40.5, 39.5, 117.0, 116.0),
                zoom: 10,
                next_id: 0,
                markers: BTreeMap::new(),
                removed: 0,
                fail_on_name: None,
            }),
        }
    }

    pub(crate) fn not_ready() -> Self {
        let map = Self::ready();
        map.state.lock().unwrap().ready = false;
        map
    }

    pub(crate) fn set_bounds(&self, bounds: ViewportBounds) {
        self.state.lock().unwrap().bounds = bounds;
    }

    pub(crate) fn set_zoom(&self, zoom: i32) {
        self.state.lock().unwrap().zoom = zoom;
    }

    pub(crate) fn fail_on_name(&self, name: &str) {
        self.state.lock().unwrap().fail_on_name = Some(name.to_string());
    }

    pub(crate) fn marker_count(&self) -> usize {
        self.state.lock().unwrap().markers.len()
    }

    pub(crate) fn pin_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .markers
            .values()
            .filter(|m| matches!(m, FakeMarker::Pin(_)))
            .count()
    }

    pub(crate) fn cluster_counts(&self) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .markers
            .values()
            .filter_map(|m| match m {
                FakeMarker::Cluster(count) => Some(*count),
                FakeMarker::Pin(_) => None,
            })
            .collect()
    }

    pub(crate) fn removed_count(&self) -> usize {
        self.state.lock().unwrap().removed
    }

    pub(crate) fn marker_ids(&self) -> Vec<u64> {
        self.state.lock().unwrap().markers.keys().copied().collect()
    }
}

impl MapDisplay for FakeMap {
    fn is_ready(&self) -> bool {
        self.state.lock().unwrap().ready
    }

    fn bounds(&self) -> ViewportBounds {
        self.state.lock().unwrap().bounds
    }

    fn zoom(&self) -> i32 {
        self.state.lock().unwrap().zoom
    }

    fn set_view(&self, center: Coord<f64>, zoom: i32) {
        let mut state = self.state.lock().unwrap();
        let lat_span = state.bounds.north() - state.bounds.south();
        let lng_span = state.bounds.east() - state.bounds.west();
        state.bounds = ViewportBounds::around(center, lat_span, lng_span);
        state.zoom = zoom;
    }

    fn add_pin(&self, point: &PinPoint) -> Result<MarkerId> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_name.as_deref() == Some(point.name()) {
            return Err(PinsError::Render {
                reason: format!("refusing {}", point.name()),
            });
        }
        state.next_id += 1;
        let id = state.next_id;
        state
            .markers
            .insert(id, FakeMarker::Pin(point.source_index()));
        Ok(MarkerId(id))
    }

    fn add_cluster(&self, cluster: &Cluster, _style: BadgeStyle) -> Result<MarkerId> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.markers.insert(id, FakeMarker::Cluster(cluster.count()));
        Ok(MarkerId(id))
    }

    fn remove_marker(&self, id: MarkerId) {
        let mut state = self.state.lock().unwrap();
        if state.markers.remove(&id.0).is_some() {
            state.removed += 1;
        }
    }
}

/// Notifier double that keeps every message
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) notifications: Mutex<Vec<(NotifyLevel, String)>>,
    pub(crate) statuses: Mutex<Vec<(NotifyLevel, String)>>,
    pub(crate) stats: Mutex<Vec<RenderStats>>,
}

impl RecordingNotifier {
    pub(crate) fn last_notification(&self) -> Option<(NotifyLevel, String)> {
        self.notifications.lock().unwrap().last().cloned()
    }

    pub(crate) fn last_status(&self) -> Option<(NotifyLevel, String)> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub(crate) fn last_stats(&self) -> Option<RenderStats> {
        self.stats.lock().unwrap().last().copied()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        self.notifications
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }

    fn set_status(&self, message: &str, level: NotifyLevel) {
        self.statuses
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }

    fn publish_stats(&self, stats: RenderStats) {
        self.stats.lock().unwrap().push(stats);
    }
}
