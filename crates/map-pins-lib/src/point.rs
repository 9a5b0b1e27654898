//! Pin point storage
//!
//! This module provides the `PinPoint` record produced by the position parser.
//! Points are immutable once parsed and shared by value between the session,
//! the clusterer and the render coordinator.

use geo::Coord;

/// Valid latitude range in degrees
pub(crate) const LAT_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees
pub(crate) const LNG_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A single named position on the map
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinPoint {
    /// Coordinate in degrees (`x` = longitude, `y` = latitude)
    coord: Coord<f64>,
    /// Display name (a placeholder when the source had none)
    name: String,
    /// Free-form timestamp as found in the source, if any
    timestamp: Option<String>,
    /// 1-based index of the coordinate fragment in the source text
    source_index: usize,
}

impl PinPoint {
    /// Create a new point, rejecting coordinates outside the WGS84 ranges
    ///
    /// # Returns
    /// `None` if either coordinate is NaN or out of range
    pub fn new(
        latitude: f64,
        longitude: f64,
        name: impl Into<String>,
        timestamp: Option<String>,
        source_index: usize,
    ) -> Option<Self> {
        if !Self::is_valid_coordinate(latitude, longitude) {
            return None;
        }

        Some(Self {
            coord: Coord {
                x: longitude,
                y: latitude,
            },
            name: name.into(),
            timestamp,
            source_index,
        })
    }

    /// Check a latitude/longitude pair against the WGS84 ranges
    ///
    /// NaN never passes.
    #[inline]
    pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
        LAT_RANGE.contains(&latitude) && LNG_RANGE.contains(&longitude)
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.coord.y
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.coord.x
    }

    /// Coordinate as a `geo` coordinate (`x` = longitude, `y` = latitude)
    #[inline]
    pub fn coord(&self) -> Coord<f64> {
        self.coord
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    #[inline]
    pub fn source_index(&self) -> usize {
        self.source_index
    }
}
