//! Viewport bounds and visibility filtering

use crate::PinPoint;
use geo::{Coord, Rect};
use rayon::prelude::*;

/// Default edge tolerance for move events, in degrees (about 100 meters)
pub const DEFAULT_MOVE_TOLERANCE_DEG: f64 = 0.001;

/// Snapshot of the visible geographic rectangle
///
/// Stored as a `geo::Rect` with `x` = longitude and `y` = latitude, so the
/// edges are always normalised (`south <= north`, `west <= east`).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportBounds {
    rect: Rect<f64>,
}

impl ViewportBounds {
    /// Create bounds from the four edges in degrees
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            rect: Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north }),
        }
    }

    /// Bounds of the given size (in degrees) centred on a coordinate
    pub fn around(center: Coord<f64>, lat_span: f64, lng_span: f64) -> Self {
        let half_lat = lat_span / 2.0;
        let half_lng = lng_span / 2.0;
        Self::new(
            center.y + half_lat,
            center.y - half_lat,
            center.x + half_lng,
            center.x - half_lng,
        )
    }

    #[inline]
    pub fn north(&self) -> f64 {
        self.rect.max().y
    }

    #[inline]
    pub fn south(&self) -> f64 {
        self.rect.min().y
    }

    #[inline]
    pub fn east(&self) -> f64 {
        self.rect.max().x
    }

    #[inline]
    pub fn west(&self) -> f64 {
        self.rect.min().x
    }

    /// Underlying rectangle (`x` = longitude, `y` = latitude)
    #[inline]
    pub fn rect(&self) -> Rect<f64> {
        self.rect
    }

    #[inline]
    pub fn center(&self) -> Coord<f64> {
        self.rect.center()
    }

    /// Whether a point lies inside the bounds (edges inclusive)
    #[inline]
    pub fn contains(&self, point: &PinPoint) -> bool {
        let lat = point.latitude();
        let lng = point.longitude();
        lat >= self.south() && lat <= self.north() && lng >= self.west() && lng <= self.east()
    }

    /// Shift the bounds by the given offsets in degrees
    pub fn translated(&self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(
            self.north() + d_lat,
            self.south() + d_lat,
            self.east() + d_lng,
            self.west() + d_lng,
        )
    }

    /// Whether any edge moved by at least `tolerance` degrees
    ///
    /// Moves smaller than the tolerance on all four edges are considered
    /// negligible and do not warrant a recluster.
    pub fn differs_from(&self, other: &ViewportBounds, tolerance: f64) -> bool {
        (self.north() - other.north()).abs() >= tolerance
            || (self.south() - other.south()).abs() >= tolerance
            || (self.east() - other.east()).abs() >= tolerance
            || (self.west() - other.west()).abs() >= tolerance
    }
}

/// Keep the points that lie inside `bounds`, preserving order
///
/// Inputs with at least `parallel_cutoff` points are filtered on the rayon
/// pool; the collect keeps the original order either way.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn filter_visible(
    points: &[PinPoint],
    bounds: &ViewportBounds,
    parallel_cutoff: usize,
) -> Vec<PinPoint> {
    if points.len() >= parallel_cutoff {
        points
            .par_iter()
            .filter(|p| bounds.contains(p))
            .cloned()
            .collect()
    } else {
        points
            .iter()
            .filter(|p| bounds.contains(p))
            .cloned()
            .collect()
    }
}
