//! Per-controller working set
//!
//! A [`Session`] holds everything a navigation event needs to recluster without
//! reparsing: the full point set, the zoom it was last rendered at, the bounds
//! that were last used and the counters shown to the user.

use crate::{PinPoint, RenderStats, ViewportBounds};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Session {
    all_points: Arc<[PinPoint]>,
    current_zoom: i32,
    last_bounds: Option<ViewportBounds>,
    visible_count: usize,
    displayed_count: usize,
    epoch: u64,
}

impl Session {
    /// Create an empty session starting at `initial_zoom`
    pub fn new(initial_zoom: i32) -> Self {
        Self {
            all_points: Arc::from(Vec::new()),
            current_zoom: initial_zoom,
            last_bounds: None,
            visible_count: 0,
            displayed_count: 0,
            epoch: 0,
        }
    }

    /// Replace the working set with freshly parsed points
    ///
    /// Counters and the remembered bounds are reset; the zoom is kept.
    pub fn load(&mut self, points: Vec<PinPoint>) {
        self.epoch = self.epoch.wrapping_add(1);
        self.all_points = Arc::from(points);
        self.last_bounds = None;
        self.visible_count = 0;
        self.displayed_count = 0;
    }

    /// Drop all points and counters
    pub fn clear(&mut self) {
        self.load(Vec::new());
    }

    /// Counter bumped by every load and clear
    ///
    /// A pass that waited for the recluster gate compares it against the
    /// value seen when it took its snapshot.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_empty(&self) -> bool {
        self.all_points.is_empty()
    }

    /// Cheap shared handle to the full point set
    ///
    /// Callers filter from the snapshot after releasing the session lock.
    pub fn points(&self) -> Arc<[PinPoint]> {
        Arc::clone(&self.all_points)
    }

    pub fn total(&self) -> usize {
        self.all_points.len()
    }

    pub fn current_zoom(&self) -> i32 {
        self.current_zoom
    }

    /// Store a new zoom level, returning whether it changed
    pub fn set_zoom(&mut self, zoom: i32) -> bool {
        let changed = self.current_zoom != zoom;
        self.current_zoom = zoom;
        changed
    }

    pub fn last_bounds(&self) -> Option<ViewportBounds> {
        self.last_bounds
    }

    pub fn set_last_bounds(&mut self, bounds: ViewportBounds) {
        self.last_bounds = Some(bounds);
    }

    /// Whether `bounds` moved far enough from the last used bounds to recluster
    ///
    /// With no remembered bounds every viewport counts as moved.
    pub fn has_moved(&self, bounds: &ViewportBounds, tolerance: f64) -> bool {
        match &self.last_bounds {
            Some(last) => bounds.differs_from(last, tolerance),
            None => true,
        }
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn set_visible_count(&mut self, visible: usize) {
        self.visible_count = visible;
    }

    pub fn set_displayed_count(&mut self, displayed: usize) {
        self.displayed_count = displayed;
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            total: self.all_points.len(),
            visible: self.visible_count,
            displayed: self.displayed_count,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(crate::policy::DEFAULT_INITIAL_ZOOM)
    }
}
