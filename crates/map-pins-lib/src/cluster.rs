//! Grid-based spatial clustering
//!
//! Points are bucketed into a fixed grid whose resolution comes from the zoom
//! policy. Each occupied cell becomes one cluster. When there are more cells
//! than the policy allows, the smallest clusters are folded into their nearest
//! neighbour until the cap holds.

use crate::{PinPoint, ZoomPolicy, utils};
use geo::Coord;
use std::collections::HashMap;

/// A group of nearby points shown as one numbered badge
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    /// Centroid in degrees (`x` = longitude, `y` = latitude)
    centroid: Coord<f64>,
    /// Member points in insertion order
    members: Vec<PinPoint>,
}

/// Result of a clustering pass
///
/// Individual points and clusters are rendered differently (pin icon versus
/// numbered badge), so "no clustering" is never expressed as a list of
/// one-member clusters.
#[derive(Clone, Debug, PartialEq)]
pub enum ClusterOutcome {
    /// Render every point as its own pin
    Individual(Vec<PinPoint>),
    /// Render one badge per cluster
    Clustered(Vec<Cluster>),
}

impl ClusterOutcome {
    /// Number of markers this outcome produces
    pub fn marker_count(&self) -> usize {
        match self {
            Self::Individual(points) => points.len(),
            Self::Clustered(clusters) => clusters.len(),
        }
    }

    /// Number of points covered by this outcome
    pub fn point_count(&self) -> usize {
        match self {
            Self::Individual(points) => points.len(),
            Self::Clustered(clusters) => clusters.iter().map(Cluster::count).sum(),
        }
    }

    #[inline]
    pub fn is_clustered(&self) -> bool {
        matches!(self, Self::Clustered(_))
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Cluster {
    /// Build a cluster from its members, with the centroid as their mean
    ///
    /// # Returns
    /// `None` if `members` is empty
    pub fn from_members(members: Vec<PinPoint>) -> Option<Self> {
        let centroid = utils::mean_coord(members.iter().map(PinPoint::coord))?;
        Some(Self { centroid, members })
    }

    #[inline]
    pub fn centroid(&self) -> Coord<f64> {
        self.centroid
    }

    #[inline]
    pub fn centroid_lat(&self) -> f64 {
        self.centroid.y
    }

    #[inline]
    pub fn centroid_lng(&self) -> f64 {
        self.centroid.x
    }

    #[inline]
    pub fn members(&self) -> &[PinPoint] {
        &self.members
    }

    /// Number of member points
    #[inline]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Fold another cluster into this one
    ///
    /// The members of `other` are appended and the new centroid is the plain
    /// average of the two previous centroids, not weighted by member count.
    pub fn absorb(&mut self, other: Cluster) {
        self.centroid = Coord {
            x: (self.centroid.x + other.centroid.x) / 2.0,
            y: (self.centroid.y + other.centroid.y) / 2.0,
        };
        self.members.extend(other.members);
    }
}

/// Running accumulator for one grid cell
struct CellAccumulator {
    sum: Coord<f64>,
    members: Vec<PinPoint>,
}

impl CellAccumulator {
    fn into_cluster(self) -> Cluster {
        let n = self.members.len() as f64;
        Cluster {
            centroid: Coord {
                x: self.sum.x / n,
                y: self.sum.y / n,
            },
            members: self.members,
        }
    }
}

/// Cluster the given points according to a zoom policy
///
/// Returns [`ClusterOutcome::Individual`] when the policy disables clustering
/// or the point count does not exceed the policy threshold. Otherwise the
/// points are gridded and merged down to at most `max_clusters` clusters
/// (a cap of zero is treated as one).
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn cluster_points(points: Vec<PinPoint>, policy: &ZoomPolicy) -> ClusterOutcome {
    if !policy.clustering_enabled || points.len() <= policy.cluster_threshold {
        return ClusterOutcome::Individual(points);
    }

    let input_len = points.len();
    let clusters = bucket_into_grid(points, policy.grid_resolution);
    let cells = clusters.len();
    let clusters = merge_to_cap(clusters, policy.max_clusters.max(1));

    tracing::debug!(
        points = input_len,
        cells,
        clusters = clusters.len(),
        zoom = policy.zoom_level,
        "Clustered visible points"
    );

    ClusterOutcome::Clustered(clusters)
}

/// Group points by grid cell, keeping cells in first-seen order
fn bucket_into_grid(points: Vec<PinPoint>, resolution: f64) -> Vec<Cluster> {
    #[cfg(feature = "profiling")]
    profiling::scope!("bucket_into_grid");

    let mut cell_lookup: HashMap<(i64, i64), usize> = HashMap::new();
    let mut cells: Vec<CellAccumulator> = Vec::new();

    for point in points {
        let key = (
            utils::grid_index(point.latitude(), resolution),
            utils::grid_index(point.longitude(), resolution),
        );
        let idx = *cell_lookup.entry(key).or_insert_with(|| {
            cells.push(CellAccumulator {
                sum: Coord { x: 0.0, y: 0.0 },
                members: Vec::new(),
            });
            cells.len() - 1
        });

        let cell = &mut cells[idx];
        cell.sum.x += point.longitude();
        cell.sum.y += point.latitude();
        cell.members.push(point);
    }

    cells.into_iter().map(CellAccumulator::into_cluster).collect()
}

/// Merge the smallest clusters into their nearest neighbours until at most
/// `max_clusters` remain
///
/// Clusters are ranked once by ascending count (stable, so equal counts keep
/// first-seen order). The k-th ranked cluster is merged into the nearest
/// cluster ranked after it; on exact distance ties the first one in rank
/// order wins. Ranks are not refreshed as targets grow.
fn merge_to_cap(clusters: Vec<Cluster>, max_clusters: usize) -> Vec<Cluster> {
    if clusters.len() <= max_clusters {
        return clusters;
    }
    #[cfg(feature = "profiling")]
    profiling::scope!("merge_to_cap");

    let excess = clusters.len() - max_clusters;

    let mut ranked: Vec<usize> = (0..clusters.len()).collect();
    ranked.sort_by_key(|&i| clusters[i].count());

    let mut slots: Vec<Option<Cluster>> = clusters.into_iter().map(Some).collect();

    for rank in 0..excess {
        let source_idx = ranked[rank];
        let Some(source_centroid) = slots[source_idx].as_ref().map(Cluster::centroid) else {
            continue;
        };

        let mut nearest: Option<usize> = None;
        let mut min_distance = f64::INFINITY;
        for &candidate in &ranked[rank + 1..] {
            let Some(other) = slots[candidate].as_ref() else {
                continue;
            };
            let distance = utils::degree_distance(source_centroid, other.centroid);
            if distance < min_distance {
                min_distance = distance;
                nearest = Some(candidate);
            }
        }

        if let Some(target_idx) = nearest
            && let Some(source) = slots[source_idx].take()
            && let Some(target) = slots[target_idx].as_mut()
        {
            target.absorb(source);
        }
    }

    slots.into_iter().flatten().collect()
}
