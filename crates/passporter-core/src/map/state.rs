//! Display state and the input cells it is derived from.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::models::{BorderPoint, CameraPosition, LatLng};
use crate::Error;

/// What the map screen should render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum MapUiState {
    /// Waiting for the first value of every required input
    Loading,
    /// Location access is missing; only a permission grant recovers
    LocationPermissionRequired,
    /// A subscription failed; recovery needs a retry
    Error { message: String },
    #[serde(rename_all = "camelCase")]
    Success {
        border_points: Vec<BorderPoint>,
        user_location: LatLng,
        selected_border_point: Option<BorderPoint>,
        last_camera_position: Option<CameraPosition>,
    },
}

impl MapUiState {
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Whether input changes are folded into the published state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) enum Phase {
    /// Not started, or torn down
    #[default]
    Idle,
    Running,
    /// Parked in an error or permission state until re-initialized
    Halted,
}

#[derive(Debug, Default)]
pub(super) struct Inputs {
    pub points: Vec<BorderPoint>,
    pub location: Option<LatLng>,
    pub selected: Option<BorderPoint>,
    pub camera: Option<CameraPosition>,
    pub phase: Phase,
}

impl Inputs {
    /// No fix yet means no map: stay in `Loading` even with points known.
    fn combine(&self) -> MapUiState {
        match self.location {
            None => MapUiState::Loading,
            Some(user_location) => MapUiState::Success {
                border_points: self.points.clone(),
                user_location,
                selected_border_point: self.selected.clone(),
                last_camera_position: self.camera,
            },
        }
    }
}

/// Input cells plus the published state, shared with the session tasks
pub(super) struct Shared {
    inputs: Mutex<Inputs>,
    state: watch::Sender<MapUiState>,
    generic_error: String,
}

impl Shared {
    pub fn new(generic_error: String) -> Self {
        let (state, _) = watch::channel(MapUiState::Loading);
        Self {
            inputs: Mutex::new(Inputs::default()),
            state,
            generic_error,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MapUiState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> MapUiState {
        self.state.borrow().clone()
    }

    pub fn lock(&self) -> MutexGuard<'_, Inputs> {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the inputs and recombine under the same lock, so every
    /// published state reflects one consistent snapshot.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut Inputs) -> R) -> R {
        let mut inputs = self.lock();
        let result = mutate(&mut inputs);
        if inputs.phase == Phase::Running {
            let next = inputs.combine();
            self.state.send_if_modified(|current| {
                let modified = *current != next;
                if modified {
                    *current = next;
                }
                modified
            });
        }
        result
    }

    /// Begin a fresh session: drop session inputs, keep selection and camera.
    pub fn reset(&self, phase: Phase) {
        let mut inputs = self.lock();
        inputs.points.clear();
        inputs.location = None;
        inputs.phase = phase;
        self.state.send_replace(MapUiState::Loading);
    }

    pub fn replace_points(&self, points: Vec<BorderPoint>) {
        tracing::debug!("Map holds {} border points", points.len());
        self.update(|inputs| inputs.points = points);
    }

    pub fn set_location(&self, fix: LatLng) {
        self.update(|inputs| inputs.location = Some(fix));
    }

    pub fn require_permission(&self) {
        self.halt(MapUiState::LocationPermissionRequired);
    }

    pub fn fail(&self, error: &Error) {
        let message = error
            .message()
            .unwrap_or_else(|| self.generic_error.clone());
        self.halt(MapUiState::Error { message });
    }

    pub fn stop(&self) {
        self.lock().phase = Phase::Idle;
    }

    fn halt(&self, state: MapUiState) {
        let mut inputs = self.lock();
        inputs.phase = Phase::Halted;
        self.state.send_replace(state);
    }
}
