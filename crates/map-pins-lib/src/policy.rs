//! Zoom-dependent clustering policy
//!
//! Every integer zoom level from 1 (whole world) to 18 (single buildings) has
//! its own clustering parameters. Lookups for levels without an entry fall back
//! to the closest defined level below, and below every defined level to a
//! permissive default, so `policy_for` is total over `i32`.

use crate::{PinsError, Result};
use std::collections::BTreeMap;

/// Lowest zoom level of the built-in table
pub const MIN_ZOOM: i32 = 1;

/// Highest zoom level of the built-in table
pub const MAX_ZOOM: i32 = 18;

/// First zoom level at which the built-in table stops clustering
pub const DETAIL_ZOOM: i32 = 14;

/// Zoom level a fresh session starts at
pub const DEFAULT_INITIAL_ZOOM: i32 = 10;

/// Clustering parameters for one zoom level
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoomPolicy {
    /// Zoom level this policy was defined for (0 for the fallback default)
    pub zoom_level: i32,
    /// Visible point counts up to this value are rendered individually
    pub cluster_threshold: usize,
    /// Grid cells per degree used for bucketing
    pub grid_resolution: f64,
    /// Maximum number of clusters after merging
    pub max_clusters: usize,
    /// Whether clustering happens at all at this zoom
    pub clustering_enabled: bool,
}

impl ZoomPolicy {
    /// Policy used when the zoom is below every defined level
    pub const PERMISSIVE_DEFAULT: ZoomPolicy = ZoomPolicy {
        zoom_level: 0,
        cluster_threshold: 1,
        grid_resolution: 1.0,
        max_clusters: 2000,
        clustering_enabled: true,
    };

    const fn level(
        zoom_level: i32,
        cluster_threshold: usize,
        grid_resolution: f64,
        max_clusters: usize,
    ) -> Self {
        Self {
            zoom_level,
            cluster_threshold,
            grid_resolution,
            max_clusters,
            clustering_enabled: zoom_level < DETAIL_ZOOM,
        }
    }
}

/// Built-in policy for zoom levels 1 to 18
const BUILTIN_POLICIES: [ZoomPolicy; 18] = [
    ZoomPolicy::level(1, 10000, 5000.0, 5),
    ZoomPolicy::level(2, 8000, 4000.0, 8),
    ZoomPolicy::level(3, 6000, 3000.0, 12),
    ZoomPolicy::level(4, 4000, 2000.0, 20),
    ZoomPolicy::level(5, 3000, 1500.0, 30),
    ZoomPolicy::level(6, 2000, 1000.0, 50),
    ZoomPolicy::level(7, 1500, 800.0, 80),
    ZoomPolicy::level(8, 1000, 600.0, 120),
    ZoomPolicy::level(9, 800, 400.0, 180),
    ZoomPolicy::level(10, 600, 300.0, 250),
    ZoomPolicy::level(11, 400, 200.0, 350),
    ZoomPolicy::level(12, 300, 150.0, 500),
    ZoomPolicy::level(13, 200, 100.0, 700),
    ZoomPolicy::level(14, 150, 75.0, 1000),
    ZoomPolicy::level(15, 100, 50.0, 1200),
    ZoomPolicy::level(16, 50, 30.0, 1500),
    ZoomPolicy::level(17, 30, 20.0, 1800),
    ZoomPolicy::level(18, 20, 10.0, 2000),
];

/// Base cluster badge size in pixels for zoom levels 1 to 18
const BADGE_BASE_SIZES: [f32; 18] = [
    80.0, 75.0, 70.0, 65.0, 60.0, 55.0, 50.0, 45.0, 40.0, 35.0, 30.0, 28.0, 25.0, 22.0, 20.0,
    18.0, 16.0, 14.0,
];

/// Lookup table from zoom level to clustering policy
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoomPolicyTable {
    policies: BTreeMap<i32, ZoomPolicy>,
    fallback: ZoomPolicy,
}

impl Default for ZoomPolicyTable {
    fn default() -> Self {
        Self {
            policies: BUILTIN_POLICIES.iter().map(|p| (p.zoom_level, *p)).collect(),
            fallback: ZoomPolicy::PERMISSIVE_DEFAULT,
        }
    }
}

impl ZoomPolicyTable {
    /// Build a table from custom policies
    ///
    /// Each policy is keyed by its `zoom_level`. Fails if the list is empty or
    /// defines the same level twice.
    pub fn from_policies(policies: impl IntoIterator<Item = ZoomPolicy>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for policy in policies {
            if map.insert(policy.zoom_level, policy).is_some() {
                return Err(PinsError::InvalidPolicyTable(format!(
                    "zoom level {} defined twice",
                    policy.zoom_level
                )));
            }
        }
        if map.is_empty() {
            return Err(PinsError::InvalidPolicyTable(
                "no zoom levels defined".to_string(),
            ));
        }
        Ok(Self {
            policies: map,
            fallback: ZoomPolicy::PERMISSIVE_DEFAULT,
        })
    }

    /// Policy for a zoom level
    ///
    /// Exact match if defined, otherwise the greatest defined level below
    /// `zoom`, otherwise the permissive default.
    #[inline]
    pub fn policy_for(&self, zoom: i32) -> ZoomPolicy {
        self.policies
            .range(..=zoom)
            .next_back()
            .map(|(_, policy)| *policy)
            .unwrap_or(self.fallback)
    }

    /// Copy of this table with every cluster threshold scaled by `factor`
    ///
    /// Handy for tuning how eagerly clustering kicks in without redefining
    /// the whole table. Thresholds never drop below 1.
    pub fn with_threshold_scale(&self, factor: f64) -> Self {
        let scale = |threshold: usize| ((threshold as f64 * factor).round() as usize).max(1);
        Self {
            policies: self
                .policies
                .iter()
                .map(|(level, policy)| {
                    (
                        *level,
                        ZoomPolicy {
                            cluster_threshold: scale(policy.cluster_threshold),
                            ..*policy
                        },
                    )
                })
                .collect(),
            fallback: self.fallback,
        }
    }

    /// Number of explicitly defined levels
    #[inline]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Iterate the defined policies in ascending zoom order
    pub fn iter(&self) -> impl Iterator<Item = &ZoomPolicy> {
        self.policies.values()
    }
}

/// Size hints handed to the map collaborator for a cluster badge
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BadgeStyle {
    /// Badge diameter in pixels
    pub size_px: f32,
    /// Label font size in pixels
    pub font_px: f32,
}

/// Badge sizing for a cluster of `count` points at the given zoom
///
/// Badges grow with the member count up to twice the zoom's base size.
/// Zooms outside 1..=18 use the nearest end of the table.
pub fn badge_style(zoom: i32, count: usize) -> BadgeStyle {
    let idx = (zoom.clamp(MIN_ZOOM, MAX_ZOOM) - MIN_ZOOM) as usize;
    let base = BADGE_BASE_SIZES[idx];
    let size_px = (base * 2.0).min(base.max(base + count as f32 / 10.0));
    let font_px = (base / 2.0).clamp(10.0, 16.0);
    BadgeStyle { size_px, font_px }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_complete() {
        let table = ZoomPolicyTable::default();
        assert_eq!(table.len(), 18);
        for zoom in MIN_ZOOM..=MAX_ZOOM {
            assert_eq!(table.policy_for(zoom).zoom_level, zoom);
        }
    }

    #[test]
    fn test_clustering_disabled_from_detail_zoom() {
        let table = ZoomPolicyTable::default();
        for zoom in MIN_ZOOM..=MAX_ZOOM {
            assert_eq!(
                table.policy_for(zoom).clustering_enabled,
                zoom < 14,
                "zoom {zoom}"
            );
        }
    }

    #[test]
    fn test_below_range_uses_default() {
        let table = ZoomPolicyTable::default();
        for zoom in [0, -1, -100, i32::MIN] {
            assert_eq!(table.policy_for(zoom), ZoomPolicy::PERMISSIVE_DEFAULT);
        }
        assert!(ZoomPolicy::PERMISSIVE_DEFAULT.clustering_enabled);
        assert_eq!(ZoomPolicy::PERMISSIVE_DEFAULT.max_clusters, 2000);
    }

    #[test]
    fn test_above_range_uses_highest_level() {
        let table = ZoomPolicyTable::default();
        assert_eq!(table.policy_for(19).zoom_level, 18);
        assert_eq!(table.policy_for(i32::MAX).zoom_level, 18);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let table = ZoomPolicyTable::default();
        for zoom in -3..25 {
            assert_eq!(table.policy_for(zoom), table.policy_for(zoom));
        }
    }

    #[test]
    fn test_known_values() {
        let table = ZoomPolicyTable::default();
        let z9 = table.policy_for(9);
        assert_eq!(z9.cluster_threshold, 800);
        assert_eq!(z9.grid_resolution, 400.0);
        assert_eq!(z9.max_clusters, 180);
        assert!(z9.clustering_enabled);
    }

    #[test]
    fn test_sparse_table_falls_back_to_lower_level() {
        let table = ZoomPolicyTable::from_policies([
            ZoomPolicy::level(5, 100, 10.0, 10),
            ZoomPolicy::level(10, 50, 20.0, 20),
        ])
        .unwrap();

        assert_eq!(table.policy_for(4), ZoomPolicy::PERMISSIVE_DEFAULT);
        assert_eq!(table.policy_for(5).zoom_level, 5);
        assert_eq!(table.policy_for(9).zoom_level, 5);
        assert_eq!(table.policy_for(10).zoom_level, 10);
        assert_eq!(table.policy_for(17).zoom_level, 10);
    }

    #[test]
    fn test_from_policies_rejects_bad_tables() {
        assert!(ZoomPolicyTable::from_policies(Vec::new()).is_err());

        let dup = ZoomPolicyTable::from_policies([
            ZoomPolicy::level(3, 1, 1.0, 1),
            ZoomPolicy::level(3, 2, 2.0, 2),
        ]);
        assert!(matches!(dup, Err(PinsError::InvalidPolicyTable(_))));
    }

    #[test]
    fn test_threshold_scale() {
        let table = ZoomPolicyTable::default().with_threshold_scale(0.5);
        assert_eq!(table.policy_for(1).cluster_threshold, 5000);
        assert_eq!(table.policy_for(18).cluster_threshold, 10);
        // Other parameters untouched
        assert_eq!(table.policy_for(1).max_clusters, 5);

        let tiny = ZoomPolicyTable::default().with_threshold_scale(0.0);
        assert!(tiny.iter().all(|p| p.cluster_threshold == 1));
    }

    #[test]
    fn test_badge_style() {
        // Zoom 10 has a base size of 35px
        let small = badge_style(10, 10);
        assert_eq!(small.size_px, 36.0);
        assert_eq!(small.font_px, 16.0);

        let large = badge_style(10, 10_000);
        assert_eq!(large.size_px, 70.0);

        // Zoom 18 has a base size of 14px, font bottoms out at 10px
        let detail = badge_style(18, 0);
        assert_eq!(detail.size_px, 14.0);
        assert_eq!(detail.font_px, 10.0);

        // Out of range zooms clamp to the table ends
        assert_eq!(badge_style(-5, 0).size_px, 80.0);
        assert_eq!(badge_style(30, 0).size_px, 14.0);
    }
}
