//! Border point store contract and implementations.
//!
//! Live subscriptions are `futures` streams: each item is one full snapshot of
//! the subscribed set. Dropping the stream cancels the subscription and
//! releases whatever listener backs it.

mod firestore;
#[cfg(test)]
pub(crate) mod memory;
mod mirrored;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::models::{BorderPoint, BorderPointId, BorderUpdate, LatLngBounds};
use crate::Result;

pub use firestore::FirestoreBorderPointStore;
pub use mirrored::MirroredBorderPointStore;

/// A live sequence of point snapshots
pub type PointsStream = BoxStream<'static, Result<Vec<BorderPoint>>>;

/// A live sequence of update lists, newest first
pub type UpdatesStream = BoxStream<'static, Result<Vec<BorderUpdate>>>;

/// Source of truth for border points and their status updates
#[async_trait]
pub trait BorderPointStore: Send + Sync + 'static {
    /// Subscribe to every non-deleted point
    fn subscribe_all(&self) -> PointsStream;

    /// Subscribe to non-deleted points inside `bounds`
    fn subscribe_bounded(&self, bounds: LatLngBounds) -> PointsStream;

    /// Look up a point by id, soft-deleted ones included
    async fn get(&self, id: &BorderPointId) -> Result<Option<BorderPoint>>;

    /// Store a new point
    async fn create(&self, point: &BorderPoint) -> Result<()>;

    /// Replace an existing point wholesale
    async fn update(&self, point: &BorderPoint) -> Result<()>;

    /// Flag a point as deleted by `actor_id`
    async fn soft_delete(&self, id: &BorderPointId, actor_id: &str) -> Result<()>;

    /// Subscribe to status updates for one point, newest first
    fn subscribe_updates(&self, id: &BorderPointId) -> UpdatesStream;

    /// Append a status update
    async fn add_update(&self, update: &BorderUpdate) -> Result<()>;
}
