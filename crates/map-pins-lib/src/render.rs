//! Marker rendering against an external map display
//!
//! The [`RenderCoordinator`] is the only owner of on-screen markers. Every pass
//! removes everything it added before and then adds the new set; there is no
//! diffing. Individual pins are added in batches with a short pause in between
//! so the host stays responsive while thousands of markers go up.

use crate::{BadgeStyle, Cluster, ClusterOutcome, PinPoint, Result, ViewportBounds, badge_style};
use geo::Coord;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Opaque handle for a marker added to the map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerId(pub u64);

/// Capabilities the core needs from the map widget
///
/// Implementations are expected to be cheap to call; the coordinator calls
/// `add_*` once per marker and never holds an await point across a call.
pub trait MapDisplay: Send + Sync {
    /// Whether the map finished initialising and can answer queries
    fn is_ready(&self) -> bool;

    /// Currently visible rectangle
    fn bounds(&self) -> ViewportBounds;

    /// Current integer zoom level
    fn zoom(&self) -> i32;

    /// Move the camera
    fn set_view(&self, center: Coord<f64>, zoom: i32);

    /// Add a single pin marker
    fn add_pin(&self, point: &PinPoint) -> Result<MarkerId>;

    /// Add a numbered badge marker for a cluster
    fn add_cluster(&self, cluster: &Cluster, style: BadgeStyle) -> Result<MarkerId>;

    /// Remove a marker previously returned by `add_pin` or `add_cluster`
    fn remove_marker(&self, id: MarkerId);
}

/// Point and marker counters shown to the user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderStats {
    /// Points in the loaded data set
    pub total: usize,
    /// Points inside the current viewport
    pub visible: usize,
    /// Markers currently on the map
    pub displayed: usize,
}

/// Outcome of one render pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Markers added by this pass
    pub displayed: usize,
    /// Markers the map refused (skipped)
    pub failed: usize,
    /// Whether a newer pass or a clear discarded this one before it finished
    pub cancelled: bool,
}

/// Markers owned by the coordinator plus the generation that owns them
#[derive(Debug, Default)]
struct ActiveMarkers {
    generation: u64,
    ids: Vec<MarkerId>,
}

/// Owns the lifecycle of every marker on the map
pub struct RenderCoordinator {
    map: Arc<dyn MapDisplay>,
    active: Mutex<ActiveMarkers>,
    batch_size: usize,
    batch_pause: Duration,
}

impl std::fmt::Debug for RenderCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCoordinator")
            .field("active", &self.lock_active().ids.len())
            .field("batch_size", &self.batch_size)
            .field("batch_pause", &self.batch_pause)
            .finish()
    }
}

impl RenderCoordinator {
    /// Create a coordinator drawing onto `map`
    ///
    /// # Arguments
    /// * `batch_size` - Pins added per batch (0 is treated as 1)
    /// * `batch_pause` - Pause between pin batches
    pub fn new(map: Arc<dyn MapDisplay>, batch_size: usize, batch_pause: Duration) -> Self {
        Self {
            map,
            active: Mutex::new(ActiveMarkers::default()),
            batch_size: batch_size.max(1),
            batch_pause,
        }
    }

    /// Replace everything on the map with the given outcome
    ///
    /// `on_batch` is called with the running number of displayed markers after
    /// each batch that made it onto the map.
    pub async fn render(
        &self,
        outcome: ClusterOutcome,
        zoom: i32,
        mut on_batch: impl FnMut(usize) + Send,
    ) -> RenderSummary {
        let generation = self.begin_pass();
        let mut summary = RenderSummary::default();

        match outcome {
            ClusterOutcome::Clustered(clusters) => {
                let mut active = self.lock_active();
                if active.generation != generation {
                    summary.cancelled = true;
                    return summary;
                }
                for cluster in &clusters {
                    let style = badge_style(zoom, cluster.count());
                    match self.map.add_cluster(cluster, style) {
                        Ok(id) => {
                            active.ids.push(id);
                            summary.displayed += 1;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Skipping cluster of {} at ({:.6}, {:.6}): {e}",
                                cluster.count(),
                                cluster.centroid_lat(),
                                cluster.centroid_lng()
                            );
                            summary.failed += 1;
                        }
                    }
                }
                drop(active);
                on_batch(summary.displayed);
            }
            ClusterOutcome::Individual(points) => {
                for (batch_index, batch) in points.chunks(self.batch_size).enumerate() {
                    if batch_index > 0 && !self.batch_pause.is_zero() {
                        tokio::time::sleep(self.batch_pause).await;
                    }
                    if !self.add_pin_batch(generation, batch, &mut summary) {
                        tracing::debug!(
                            "Render pass {generation} discarded after {} pins",
                            summary.displayed
                        );
                        summary.cancelled = true;
                        return summary;
                    }
                    on_batch(summary.displayed);
                }
            }
        }

        summary
    }

    /// Remove every marker and invalidate any pass still in flight
    pub fn clear(&self) {
        let mut active = self.lock_active();
        active.generation += 1;
        self.remove_all(&mut active);
    }

    /// Number of markers currently on the map
    pub fn active_count(&self) -> usize {
        self.lock_active().ids.len()
    }

    /// Generation of the most recent pass or clear
    pub fn generation(&self) -> u64 {
        self.lock_active().generation
    }

    /// Start a new pass: take a new generation and wipe the previous markers
    fn begin_pass(&self) -> u64 {
        let mut active = self.lock_active();
        active.generation += 1;
        self.remove_all(&mut active);
        active.generation
    }

    /// Add one batch of pins if `generation` is still current
    ///
    /// The check and the additions happen under the same lock, so a stale
    /// pass can never add markers after a newer pass wiped the map.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn add_pin_batch(
        &self,
        generation: u64,
        batch: &[PinPoint],
        summary: &mut RenderSummary,
    ) -> bool {
        let mut active = self.lock_active();
        if active.generation != generation {
            return false;
        }
        for point in batch {
            match self.map.add_pin(point) {
                Ok(id) => {
                    active.ids.push(id);
                    summary.displayed += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping pin '{}': {e}", point.name());
                    summary.failed += 1;
                }
            }
        }
        true
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn remove_all(&self, active: &mut ActiveMarkers) {
        for id in active.ids.drain(..) {
            self.map.remove_marker(id);
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, ActiveMarkers> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
