//! Map viewport sync.
//!
//! [`MapSync`] folds four independently updating inputs (the border points in
//! view, the live location, the selected point and the camera) into one
//! [`MapUiState`], and owns the permission and error lifecycle around them.

mod state;

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::location::{LocationSource, LocationStream};
use crate::models::{BorderPoint, CameraPosition, LatLng, LatLngBounds};
use crate::store::{BorderPointStore, PointsStream};
use crate::{Error, Result};

pub use state::MapUiState;
use state::{Phase, Shared};

pub const DEFAULT_MIN_ZOOM: f32 = 5.0;
const GENERIC_ERROR_MESSAGE: &str = "Something went wrong while loading the map";

/// Tuning knobs for [`MapSync`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapSyncConfig {
    /// Below this zoom no bounded query runs and the map shows no points
    pub min_zoom: f32,
    /// Route every location failure before the first fix to
    /// `LocationPermissionRequired`, not just permission-class ones
    pub broad_init_failure_fallback: bool,
    /// Shown when a failure carries no message of its own
    pub generic_error_message: String,
}

impl Default for MapSyncConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            broad_init_failure_fallback: false,
            generic_error_message: GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// A spawned subscription task and the token that stops it
struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Running {
    /// Cancel and wait until the task has dropped its streams.
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(error) = self.handle.await {
            if error.is_panic() {
                tracing::error!("Map subscription task panicked: {error}");
            }
        }
    }
}

/// Subscription tasks of the current session.
///
/// Both tasks run under `scope`; whichever halts the state cancels it, so a
/// failure in one also stops the other until the next `start`.
struct Tasks {
    scope: CancellationToken,
    session: Option<Running>,
    bounds: Option<Running>,
}

impl Tasks {
    fn new(root: &CancellationToken) -> Self {
        Self {
            scope: root.child_token(),
            session: None,
            bounds: None,
        }
    }
}

/// Orchestrates the map screen's live data.
///
/// Every subscription runs on a task owned by this value; dropping it
/// cancels them all.
pub struct MapSync<S, L> {
    store: Arc<S>,
    location: Arc<L>,
    config: MapSyncConfig,
    shared: Arc<Shared>,
    tasks: Mutex<Tasks>,
    root: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl<S: BorderPointStore, L: LocationSource> MapSync<S, L> {
    pub fn new(store: Arc<S>, location: Arc<L>, config: MapSyncConfig) -> Self {
        let root = CancellationToken::new();
        Self {
            store,
            location,
            shared: Arc::new(Shared::new(config.generic_error_message.clone())),
            config,
            tasks: Mutex::new(Tasks::new(&root)),
            _cancel_on_drop: root.clone().drop_guard(),
            root,
        }
    }

    pub const fn config(&self) -> &MapSyncConfig {
        &self.config
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<MapUiState> {
        self.shared.subscribe()
    }

    pub fn state(&self) -> MapUiState {
        self.shared.current()
    }

    /// The point set currently feeding the map, whatever the state.
    pub fn border_points(&self) -> Vec<BorderPoint> {
        self.shared.lock().points.clone()
    }

    /// Run the initialization protocol from a clean slate.
    ///
    /// Any subscriptions from an earlier session are cancelled and awaited
    /// first, so listeners never accumulate.
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;
        Self::stop_all(&mut tasks).await;
        tasks.scope = self.root.child_token();

        if !self.location.has_permission() {
            tracing::info!("Location permission missing; map waiting for grant");
            self.shared.reset(Phase::Idle);
            self.shared.require_permission();
            return;
        }

        tracing::info!("Starting map sync");
        self.shared.reset(Phase::Running);
        let points = self.store.subscribe_all();
        let cancel = tasks.scope.child_token();
        let handle = tokio::spawn(run_session(
            points,
            Arc::clone(&self.location),
            Arc::clone(&self.shared),
            self.config.broad_init_failure_fallback,
            cancel.clone(),
            tasks.scope.clone(),
        ));
        tasks.session = Some(Running { cancel, handle });
    }

    /// Location access was granted; restart from `Loading`.
    pub async fn on_permission_granted(&self) {
        tracing::info!("Location permission granted");
        self.start().await;
    }

    /// Retry action for the `Error` state.
    pub async fn retry(&self) {
        tracing::info!("Retrying map sync");
        self.start().await;
    }

    /// The visible rectangle changed.
    ///
    /// Replaces any in-flight bounded query. Below the minimum zoom the point
    /// set is cleared and nothing is fetched. After a halt no new query starts
    /// until the next `start`.
    pub async fn on_bounds_change(&self, bounds: LatLngBounds, zoom: f32) {
        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.bounds.take() {
            previous.stop().await;
        }

        if zoom < self.config.min_zoom {
            tracing::debug!("Zoom {zoom} below {}; clearing points", self.config.min_zoom);
            self.shared.replace_points(Vec::new());
            return;
        }

        if tasks.scope.is_cancelled() {
            tracing::debug!("Map sync halted; ignoring bounds change");
            return;
        }

        let points = self.store.subscribe_bounded(bounds);
        let cancel = tasks.scope.child_token();
        let handle = tokio::spawn(run_bounds(
            points,
            Arc::clone(&self.shared),
            cancel.clone(),
            tasks.scope.clone(),
        ));
        tasks.bounds = Some(Running { cancel, handle });
    }

    /// Select `point`, adding it to the map if no equal point is shown.
    pub fn select_border_point(&self, point: BorderPoint) {
        self.shared.update(|inputs| {
            if !inputs.points.contains(&point) {
                inputs.points.push(point.clone());
            }
            inputs.selected = Some(point);
        });
    }

    /// Clear the selection. A point added by selecting it stays on the map.
    pub fn clear_selected_border_point(&self) {
        self.shared.update(|inputs| inputs.selected = None);
    }

    pub fn on_camera_moved(&self, position: CameraPosition) {
        self.shared.update(|inputs| inputs.camera = Some(position));
    }

    /// Cancel every subscription and wait for them to wind down.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        Self::stop_all(&mut tasks).await;
        self.shared.stop();
        tracing::info!("Map sync shut down");
    }

    async fn stop_all(tasks: &mut Tasks) {
        tasks.scope.cancel();
        if let Some(session) = tasks.session.take() {
            session.stop().await;
        }
        if let Some(bounds) = tasks.bounds.take() {
            bounds.stop().await;
        }
    }
}

/// One initialization session: the full sync, then location once the first
/// snapshot has arrived.
///
/// `scope` is cancelled on any halting failure, taking the bounded query
/// down with it.
async fn run_session<L: LocationSource>(
    mut points: PointsStream,
    location: Arc<L>,
    shared: Arc<Shared>,
    broad_fallback: bool,
    cancel: CancellationToken,
    scope: CancellationToken,
) {
    let mut positions: Option<LocationStream> = None;
    let mut points_open = true;
    let mut positions_open = true;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            item = points.next(), if points_open => match item {
                Some(Ok(snapshot)) => {
                    shared.replace_points(snapshot);
                    if positions.is_none() {
                        tracing::debug!("First border point sync arrived; starting location updates");
                        positions = Some(location.subscribe_updates());
                    }
                }
                Some(Err(error)) => {
                    tracing::warn!("Border point sync failed: {error}");
                    shared.fail(&error);
                    scope.cancel();
                    break;
                }
                None => points_open = false,
            },
            item = next_position(&mut positions), if positions_open && positions.is_some() => match item {
                Some(Ok(fix)) => shared.set_location(fix),
                Some(Err(error)) => {
                    location_failed(&shared, &error, broad_fallback);
                    scope.cancel();
                    break;
                }
                None => positions_open = false,
            },
        }
    }
}

async fn next_position(positions: &mut Option<LocationStream>) -> Option<Result<LatLng>> {
    match positions {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

fn location_failed(shared: &Shared, error: &Error, broad_fallback: bool) {
    let has_fix = shared.lock().location.is_some();
    if error.is_permission_class() || (broad_fallback && !has_fix) {
        tracing::info!("Location unavailable ({error}); asking for permission");
        shared.require_permission();
    } else {
        tracing::warn!("Location updates failed: {error}");
        shared.fail(error);
    }
}

async fn run_bounds(
    mut points: PointsStream,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    scope: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            item = points.next() => match item {
                Some(Ok(snapshot)) => shared.replace_points(snapshot),
                Some(Err(error)) => {
                    tracing::warn!("Bounded border point query failed: {error}");
                    shared.fail(&error);
                    scope.cancel();
                    break;
                }
                None => break,
            },
        }
    }
}
