//! Navigation event handling and the load/reset entry points
//!
//! The [`NavigationController`] owns the [`Session`] and the
//! [`RenderCoordinator`]. Every handler mutates session state synchronously
//! (the session lock is never held across an `.await`) and then hands the
//! clustered result to the renderer.
//!
//! Move events are noisy: the map fires one after every drag, every zoom and
//! every programmatic pan. They are dropped when no data is loaded, when the
//! bounds barely changed, or while another move pass is still settling.

use crate::{
    ClusterOutcome, MapDisplay, PinPoint, PinsError, RenderCoordinator, RenderStats,
    RenderSummary, Result, Session, ViewportBounds, ZoomPolicy, ZoomPolicyTable, cluster_points,
    filter_visible, parse_positions, read_positions,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

/// Severity of a message shown to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Host capability for user-facing feedback
pub trait Notifier: Send + Sync {
    /// Transient notification (toast)
    fn notify(&self, message: &str, level: NotifyLevel);

    /// Persistent status line
    fn set_status(&self, message: &str, level: NotifyLevel);

    /// Updated point and marker counters
    fn publish_stats(&self, _stats: RenderStats) {}
}

/// Behaviour shared by every tool page: process the current input, or start over
pub trait PinTool {
    fn process_input(&self) -> impl Future<Output = Result<LoadReport>> + Send;

    fn reset(&self);
}

/// Where position text comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PositionSource {
    File(PathBuf),
    Text(String),
}

impl PositionSource {
    /// Read and parse the source
    pub async fn read(&self) -> Result<Vec<PinPoint>> {
        match self {
            PositionSource::File(path) => read_positions(path).await,
            PositionSource::Text(text) => Ok(parse_positions(text)),
        }
    }
}

/// Tuning knobs for the controller and its renderer
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    /// Pins added per render batch
    pub batch_size: usize,
    /// Pause between render batches
    pub batch_pause: Duration,
    /// Minimum edge change, in degrees, for a move to trigger a recluster
    pub move_tolerance: f64,
    /// How long a move pass keeps further move passes out after it finished
    pub settle_delay: Duration,
    /// Point count from which viewport filtering runs in parallel
    pub parallel_filter_cutoff: usize,
    /// Zoom level assumed before the map reports one
    pub initial_zoom: i32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_pause: Duration::from_millis(10),
            move_tolerance: crate::DEFAULT_MOVE_TOLERANCE_DEG,
            settle_delay: Duration::from_millis(100),
            parallel_filter_cutoff: 50_000,
            initial_zoom: crate::policy::DEFAULT_INITIAL_ZOOM,
        }
    }
}

/// Result of a successful load
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadReport {
    /// Points parsed from the source
    pub total: usize,
    /// Points inside the viewport at load time
    pub visible: usize,
    /// Markers put on the map
    pub displayed: usize,
}

/// Why a recluster pass runs; only changes the status line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassTrigger {
    Load,
    Zoom,
    Move,
}

/// Clears the loading flag when a load ends, however it ends
struct LoadingFlag<'a>(&'a AtomicBool);

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct NavigationController {
    map: Arc<dyn MapDisplay>,
    notifier: Arc<dyn Notifier>,
    policies: ZoomPolicyTable,
    config: ControllerConfig,
    session: Mutex<Session>,
    renderer: RenderCoordinator,
    recluster_gate: Arc<tokio::sync::Mutex<()>>,
    loading: AtomicBool,
    source: Mutex<Option<PositionSource>>,
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.lock_session();
        f.debug_struct("NavigationController")
            .field("points", &session.total())
            .field("zoom", &session.current_zoom())
            .field("renderer", &self.renderer)
            .field("config", &self.config)
            .finish()
    }
}

impl NavigationController {
    pub fn new(
        map: Arc<dyn MapDisplay>,
        notifier: Arc<dyn Notifier>,
        policies: ZoomPolicyTable,
        config: ControllerConfig,
    ) -> Self {
        let renderer = RenderCoordinator::new(map.clone(), config.batch_size, config.batch_pause);
        Self {
            map,
            notifier,
            policies,
            session: Mutex::new(Session::new(config.initial_zoom)),
            renderer,
            recluster_gate: Arc::new(tokio::sync::Mutex::new(())),
            loading: AtomicBool::new(false),
            source: Mutex::new(None),
            config,
        }
    }

    /// Remember the input used by [`PinTool::process_input`]
    pub fn set_source(&self, source: PositionSource) {
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = Some(source);
    }

    /// Read `source`, keep every parsed point and render the visible ones
    ///
    /// # Errors
    /// * [`PinsError::MapNotReady`] if the map has not finished initialising
    /// * [`PinsError::LoadInProgress`] if another load is running
    /// * [`PinsError::Parse`] / [`PinsError::Decode`] if the source cannot be
    ///   read; the session is left as it was
    pub async fn load_and_filter(&self, source: &PositionSource) -> Result<LoadReport> {
        if !self.map.is_ready() {
            let err = PinsError::MapNotReady;
            self.report_failure(&err, NotifyLevel::Error);
            return Err(err);
        }
        if self.loading.swap(true, Ordering::AcqRel) {
            let err = PinsError::LoadInProgress;
            self.notifier.notify(&err.to_string(), NotifyLevel::Warning);
            return Err(err);
        }
        let _loading = LoadingFlag(&self.loading);

        self.notifier.publish_stats(RenderStats::default());
        self.notifier
            .set_status("Loading position data for the current area...", NotifyLevel::Info);

        let points = match source.read().await {
            Ok(points) => points,
            Err(e) => {
                tracing::error!("Failed to load position data: {e}");
                self.notifier.publish_stats(self.stats());
                self.report_failure(&e, NotifyLevel::Error);
                return Err(e);
            }
        };

        let total = points.len();
        let zoom = self.map.zoom();
        let bounds = self.map.bounds();
        let snapshot = {
            let mut session = self.lock_session();
            session.load(points);
            session.set_zoom(zoom);
            session.points()
        };
        let visible = self.visible_points(&snapshot, &bounds);
        tracing::info!(
            "Loaded {total} positions, {} inside the current viewport",
            visible.len()
        );

        if visible.is_empty() {
            self.renderer.clear();
            self.record_pass(bounds, 0, 0);
            self.notifier.publish_stats(self.stats());
            let message = "No position data in the current map area";
            self.notifier.notify(message, NotifyLevel::Warning);
            self.notifier.set_status(message, NotifyLevel::Warning);
            return Ok(LoadReport {
                total,
                visible: 0,
                displayed: 0,
            });
        }

        let visible_count = visible.len();
        let summary = self
            .recluster(visible, bounds, zoom, PassTrigger::Load)
            .await;
        self.notifier.notify(
            &format!("Loaded {visible_count} positions in the current area"),
            NotifyLevel::Success,
        );

        Ok(LoadReport {
            total,
            visible: visible_count,
            displayed: summary.displayed,
        })
    }

    /// React to a zoom change reported by the map
    ///
    /// Returns the render summary when a recluster happened. Zoom passes wait
    /// for any move pass to finish instead of being dropped. A pass whose
    /// points were cleared or reloaded during that wait is abandoned.
    pub async fn on_zoom_changed(&self, zoom: i32) -> Option<RenderSummary> {
        let (snapshot, epoch) = {
            let mut session = self.lock_session();
            let previous = session.current_zoom();
            if !session.set_zoom(zoom) {
                return None;
            }
            tracing::debug!("Zoom changed {previous} -> {zoom}");
            if session.is_empty() {
                tracing::debug!("No points loaded, skipping recluster");
                return None;
            }
            (session.points(), session.epoch())
        };

        let _gate = self.recluster_gate.clone().lock_owned().await;
        if !self.is_current(epoch) {
            tracing::debug!("Points replaced while waiting for the gate, dropping zoom pass");
            return None;
        }
        let bounds = self.map.bounds();
        let visible = self.visible_points(&snapshot, &bounds);
        Some(
            self.recluster(visible, bounds, zoom, PassTrigger::Zoom)
                .await,
        )
    }

    /// React to the map being panned
    ///
    /// Returns `None` when the move was ignored: nothing loaded, the bounds
    /// changed by less than the configured tolerance, or another move pass
    /// is still running or settling.
    pub async fn on_viewport_moved(&self, bounds: ViewportBounds) -> Option<RenderSummary> {
        let (snapshot, zoom, epoch) = {
            let session = self.lock_session();
            if session.is_empty() {
                return None;
            }
            if !session.has_moved(&bounds, self.config.move_tolerance) {
                tracing::debug!("Viewport barely moved, skipping recluster");
                return None;
            }
            (session.points(), session.current_zoom(), session.epoch())
        };

        let Ok(gate) = self.recluster_gate.clone().try_lock_owned() else {
            tracing::debug!("Recluster already in flight, skipping move");
            return None;
        };
        if !self.is_current(epoch) {
            tracing::debug!("Points replaced before the move pass started, skipping");
            return None;
        }

        let visible = self.visible_points(&snapshot, &bounds);
        let summary = self
            .recluster(visible, bounds, zoom, PassTrigger::Move)
            .await;
        self.release_after_settle(gate);
        Some(summary)
    }

    /// Remove every marker and forget the loaded data
    pub fn reset(&self) {
        self.renderer.clear();
        self.lock_session().clear();
        self.notifier.publish_stats(RenderStats::default());
        self.notifier.notify("All data cleared", NotifyLevel::Info);
        tracing::info!("Session reset");
    }

    /// Current point and marker counters
    pub fn stats(&self) -> RenderStats {
        let mut stats = self.lock_session().stats();
        stats.displayed = self.renderer.active_count();
        stats
    }

    pub fn current_zoom(&self) -> i32 {
        self.lock_session().current_zoom()
    }

    pub fn last_bounds(&self) -> Option<ViewportBounds> {
        self.lock_session().last_bounds()
    }

    /// Snapshot of every loaded point
    pub fn points(&self) -> Arc<[PinPoint]> {
        self.lock_session().points()
    }

    pub fn policies(&self) -> &ZoomPolicyTable {
        &self.policies
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Cluster the visible points for `zoom` and replace the markers
    async fn recluster(
        &self,
        visible: Vec<PinPoint>,
        bounds: ViewportBounds,
        zoom: i32,
        trigger: PassTrigger,
    ) -> RenderSummary {
        let policy = self.policies.policy_for(zoom);
        let visible_count = visible.len();
        let total = self.record_pass(bounds, visible_count, 0);

        let outcome = cluster_points(visible, &policy);
        let status = pass_status_line(trigger, zoom, &outcome, &policy);

        let notifier = &self.notifier;
        let summary = self
            .renderer
            .render(outcome, zoom, |displayed| {
                notifier.publish_stats(RenderStats {
                    total,
                    visible: visible_count,
                    displayed,
                })
            })
            .await;

        if summary.cancelled {
            tracing::debug!("Render pass at zoom {zoom} superseded");
            return summary;
        }

        self.lock_session().set_displayed_count(summary.displayed);
        self.notifier.publish_stats(self.stats());
        self.notifier.set_status(&status, NotifyLevel::Success);
        tracing::info!(
            "{trigger:?} pass at zoom {zoom}: {visible_count} visible, {} markers ({} failed)",
            summary.displayed,
            summary.failed
        );
        summary
    }

    /// Whether the loaded points are still the ones seen at `epoch`
    fn is_current(&self, epoch: u64) -> bool {
        let session = self.lock_session();
        session.epoch() == epoch && !session.is_empty()
    }

    /// Store the bounds and counters of a pass, returning the total point count
    fn record_pass(&self, bounds: ViewportBounds, visible: usize, displayed: usize) -> usize {
        let mut session = self.lock_session();
        session.set_last_bounds(bounds);
        session.set_visible_count(visible);
        session.set_displayed_count(displayed);
        session.total()
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn visible_points(&self, points: &[PinPoint], bounds: &ViewportBounds) -> Vec<PinPoint> {
        filter_visible(points, bounds, self.config.parallel_filter_cutoff)
    }

    /// Keep the gate closed for the settle delay, then let move passes in again
    fn release_after_settle(&self, gate: OwnedMutexGuard<()>) {
        let delay = self.config.settle_delay;
        if delay.is_zero() {
            return;
        }
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            drop(gate);
        });
    }

    fn report_failure(&self, err: &PinsError, level: NotifyLevel) {
        let message = match err {
            PinsError::Parse { .. } | PinsError::Decode(_) => format!("Failed to load data: {err}"),
            _ => err.to_string(),
        };
        self.notifier.notify(&message, level);
        self.notifier.set_status(&message, level);
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PinTool for NavigationController {
    async fn process_input(&self) -> Result<LoadReport> {
        let source = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match source {
            Some(source) => self.load_and_filter(&source).await,
            None => {
                self.notifier
                    .notify(&PinsError::NoInput.to_string(), NotifyLevel::Warning);
                Err(PinsError::NoInput)
            }
        }
    }

    fn reset(&self) {
        NavigationController::reset(self);
    }
}

fn clustering_label(policy: &ZoomPolicy) -> &'static str {
    if policy.clustering_enabled { "on" } else { "off" }
}

/// The one status line a finished pass reports
///
/// Zoom and move passes lead with what triggered them, then the render details.
fn pass_status_line(
    trigger: PassTrigger,
    zoom: i32,
    outcome: &ClusterOutcome,
    policy: &ZoomPolicy,
) -> String {
    let details = match outcome {
        ClusterOutcome::Clustered(clusters) => format!(
            "Clustered: {} areas | threshold: {} | grid: {} | max clusters: {} | clustering: {}",
            clusters.len(),
            policy.cluster_threshold,
            policy.grid_resolution,
            policy.max_clusters,
            clustering_label(policy)
        ),
        ClusterOutcome::Individual(points) => format!(
            "Showing {} pins | threshold: {} | clustering: {}",
            points.len(),
            policy.cluster_threshold,
            clustering_label(policy)
        ),
    };
    match trigger {
        PassTrigger::Load => details,
        PassTrigger::Zoom => format!("Zoom level: {zoom} | {details}"),
        PassTrigger::Move => format!("Map moved | {details}"),
    }
}
