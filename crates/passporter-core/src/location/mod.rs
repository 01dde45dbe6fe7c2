//! Device position sources.
//!
//! Platform providers implement [`LocationSource`]; the crate ships
//! [`ReplayLocationSource`], which plays back a fixed track.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::models::LatLng;
use crate::{Error, Result};

/// A live sequence of device positions
pub type LocationStream = BoxStream<'static, Result<LatLng>>;

/// Provider of the user's position
#[async_trait]
pub trait LocationSource: Send + Sync + 'static {
    /// Whether location access is currently granted. Never suspends.
    fn has_permission(&self) -> bool;

    /// One-shot position lookup; `None` when no fix is available yet.
    async fn current_location(&self) -> Result<Option<LatLng>>;

    /// Subscribe to position updates. Dropping the stream stops the provider.
    fn subscribe_updates(&self) -> LocationStream;
}

/// Plays back a recorded track of coordinates, one per `step`.
///
/// The permission flag is shared, so a caller can flip it after construction
/// to simulate the user granting or revoking access.
#[derive(Debug, Clone)]
pub struct ReplayLocationSource {
    track: Arc<[LatLng]>,
    step: Duration,
    repeat: bool,
    permission: Arc<AtomicBool>,
}

impl ReplayLocationSource {
    pub fn new(track: impl Into<Vec<LatLng>>, step: Duration) -> Self {
        let track: Vec<LatLng> = track.into();
        Self {
            track: track.into(),
            step,
            repeat: false,
            permission: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Loop the track forever instead of ending after the last point.
    #[must_use]
    pub const fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    #[must_use]
    pub fn with_permission(self, granted: bool) -> Self {
        self.set_permission(granted);
        self
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    fn denied() -> Error {
        Error::PermissionDenied("location access has not been granted".to_string())
    }
}

#[async_trait]
impl LocationSource for ReplayLocationSource {
    fn has_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn current_location(&self) -> Result<Option<LatLng>> {
        if !self.has_permission() {
            return Err(Self::denied());
        }
        Ok(self.track.first().copied())
    }

    fn subscribe_updates(&self) -> LocationStream {
        if !self.has_permission() {
            return stream::once(async { Err(Self::denied()) }).boxed();
        }
        if self.track.is_empty() {
            return stream::empty().boxed();
        }

        let track = Arc::clone(&self.track);
        let permission = Arc::clone(&self.permission);
        let step = self.step;
        let repeat = self.repeat;
        tracing::debug!("Replaying {} positions every {:?}", track.len(), step);

        stream::unfold(Some(0_usize), move |next| {
            let track = Arc::clone(&track);
            let permission = Arc::clone(&permission);
            async move {
                let index = next?;
                if !repeat && index >= track.len() {
                    return None;
                }
                if index > 0 {
                    tokio::time::sleep(step).await;
                }
                // Revocation mid-stream surfaces once, then the stream ends
                if !permission.load(Ordering::SeqCst) {
                    return Some((Err(Self::denied()), None));
                }
                let position = track[index % track.len()];
                Some((Ok(position), Some(index.saturating_add(1))))
            }
        })
        .boxed()
    }
}
