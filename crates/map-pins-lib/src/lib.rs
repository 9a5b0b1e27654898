//! Map Pins Library - Viewport-Adaptive Pin Clustering
//!
//! This library turns a flat text dump of positions into an in-memory working set and,
//! on every map navigation event, decides what the map should show: individual pins when
//! the visible set is small or the zoom is close enough, numbered cluster badges otherwise.
//!
//! # Architecture
//!
//! - **[`parse_positions`]**: Extracts [`PinPoint`] records from semi-structured text
//! - **[`filter_visible`]**: Keeps the points inside a [`ViewportBounds`]
//! - **[`ZoomPolicyTable`]**: Per-zoom clustering parameters with a total fallback
//! - **[`cluster_points`]**: Grid bucketing plus nearest-neighbour merging under a cap
//! - **[`RenderCoordinator`]**: Owns on-screen markers, renders pins in yielding batches
//! - **[`NavigationController`]**: Reacts to zoom/move events and owns the [`Session`]
//!
//! # Performance Characteristics
//!
//! - **Filter**: O(N) single pass, parallel above a configurable cutoff
//! - **Grid bucketing**: O(N) with one hash lookup per point
//! - **Merging**: O(C²) where C is the number of occupied grid cells

mod cluster;
mod controller;
mod parser;
mod point;
mod policy;
mod render;
mod session;
#[cfg(test)]
mod test_support;
pub mod utils;
mod viewport;

// Public API exports
pub use cluster::{Cluster, ClusterOutcome, cluster_points};
pub use controller::{
    ControllerConfig, LoadReport, NavigationController, NotifyLevel, Notifier, PinTool,
    PositionSource,
};
pub use parser::{parse_positions, read_positions, read_positions_from};
pub use point::PinPoint;
pub use policy::{BadgeStyle, ZoomPolicy, ZoomPolicyTable, badge_style};
pub use render::{MapDisplay, MarkerId, RenderCoordinator, RenderStats, RenderSummary};
pub use session::Session;
pub use viewport::{DEFAULT_MOVE_TOLERANCE_DEG, ViewportBounds, filter_visible};

/// Error types for the map pins core
#[derive(Debug, thiserror::Error)]
pub enum PinsError {
    #[error("Failed to read position data: {source}")]
    Parse {
        #[from]
        source: std::io::Error,
    },

    #[error("Position data is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("Map is not ready yet, try again shortly")]
    MapNotReady,

    #[error("A load is already in progress")]
    LoadInProgress,

    #[error("No position input has been provided")]
    NoInput,

    #[error("Marker rendering failed: {reason}")]
    Render { reason: String },

    #[error("Invalid zoom policy table: {0}")]
    InvalidPolicyTable(String),
}

impl PinsError {
    /// Whether this error means the input itself could not be read or decoded
    pub fn is_parse_error(&self) -> bool {
        matches!(self, PinsError::Parse { .. } | PinsError::Decode(_))
    }

    /// Whether the failed operation can simply be retried later
    pub fn is_transient(&self) -> bool {
        matches!(self, PinsError::MapNotReady | PinsError::LoadInProgress)
    }
}

pub type Result<T> = std::result::Result<T, PinsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn() -> ZoomPolicyTable = ZoomPolicyTable::default;
        let _: fn() -> ControllerConfig = ControllerConfig::default;
        let _: fn(&str) -> Vec<PinPoint> = parse_positions;
    }

    #[test]
    fn test_error_classification() {
        let io = PinsError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_parse_error());
        assert!(!io.is_transient());

        let decode = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        assert!(PinsError::from(decode).is_parse_error());

        assert!(PinsError::MapNotReady.is_transient());
        assert!(PinsError::LoadInProgress.is_transient());
        assert!(
            !PinsError::Render {
                reason: "boom".to_string()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_error_messages() {
        let err = PinsError::InvalidPolicyTable("no levels".to_string());
        assert_eq!(err.to_string(), "Invalid zoom policy table: no levels");
        assert_eq!(
            PinsError::MapNotReady.to_string(),
            "Map is not ready yet, try again shortly"
        );
    }
}
