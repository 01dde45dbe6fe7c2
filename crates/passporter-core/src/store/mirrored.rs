//! Write-through mirror of a remote store into the local cache.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;

use super::{BorderPointStore, PointsStream, UpdatesStream};
use crate::models::{BorderPoint, BorderPointId, BorderUpdate, LatLngBounds};
use crate::services::CacheService;
use crate::util::unix_millis_now;
use crate::Result;

/// Wraps a remote store so every successful write and every subscription
/// emission also lands in the local cache.
///
/// Cache failures are logged and never turn a remote success into an error.
#[derive(Clone)]
pub struct MirroredBorderPointStore<R> {
    remote: Arc<R>,
    cache: CacheService,
}

impl<R: BorderPointStore> MirroredBorderPointStore<R> {
    pub fn new(remote: R, cache: CacheService) -> Self {
        Self {
            remote: Arc::new(remote),
            cache,
        }
    }

    pub const fn cache(&self) -> &CacheService {
        &self.cache
    }

    fn mirror_points(&self, stream: PointsStream, coverage: Coverage) -> PointsStream {
        let remote = Arc::clone(&self.remote);
        let cache = self.cache.clone();
        stream
            .then(move |snapshot| {
                let remote = Arc::clone(&remote);
                let cache = cache.clone();
                async move {
                    if let Ok(points) = &snapshot {
                        if let Err(error) = cache.upsert_points(points).await {
                            tracing::warn!("Failed to mirror {} points: {error}", points.len());
                        }
                        reconcile(remote.as_ref(), &cache, points, coverage).await;
                    }
                    snapshot
                }
            })
            .boxed()
    }
}

/// Slice of the remote set a subscription emission describes.
#[derive(Clone, Copy)]
enum Coverage {
    All,
    Within(LatLngBounds),
}

/// Refresh cached rows that an emission should have carried but did not.
///
/// Emissions only hold visible points, so a row missing from one was
/// soft-deleted, moved away, or dropped remotely. Each is re-read from the
/// remote: a returned record replaces the cached row, an absent one removes it.
async fn reconcile<R: BorderPointStore>(
    remote: &R,
    cache: &CacheService,
    points: &[BorderPoint],
    coverage: Coverage,
) {
    let cached = match coverage {
        Coverage::All => cache.list_point_ids().await,
        Coverage::Within(bounds) => cache
            .list_points_within(&bounds)
            .await
            .map(|cached| cached.into_iter().map(|point| point.id).collect()),
    };
    let cached = match cached {
        Ok(ids) => ids,
        Err(error) => {
            tracing::warn!("Failed to read cached points for reconciliation: {error}");
            return;
        }
    };

    let seen: HashSet<&BorderPointId> = points.iter().map(|point| &point.id).collect();
    for id in cached.into_iter().filter(|id| !seen.contains(id)) {
        let outcome = match remote.get(&id).await {
            Ok(Some(point)) => cache.upsert_point(&point).await,
            Ok(None) => cache.remove_point(&id).await,
            Err(error) => Err(error),
        };
        if let Err(error) = outcome {
            tracing::warn!("Failed to reconcile cached point {id}: {error}");
        }
    }
}

#[async_trait]
impl<R: BorderPointStore> BorderPointStore for MirroredBorderPointStore<R> {
    fn subscribe_all(&self) -> PointsStream {
        self.mirror_points(self.remote.subscribe_all(), Coverage::All)
    }

    fn subscribe_bounded(&self, bounds: LatLngBounds) -> PointsStream {
        self.mirror_points(self.remote.subscribe_bounded(bounds), Coverage::Within(bounds))
    }

    async fn get(&self, id: &BorderPointId) -> Result<Option<BorderPoint>> {
        let point = self.remote.get(id).await?;
        if let Some(point) = &point {
            if let Err(error) = self.cache.upsert_point(point).await {
                tracing::warn!("Failed to mirror point {id}: {error}");
            }
        }
        Ok(point)
    }

    async fn create(&self, point: &BorderPoint) -> Result<()> {
        self.remote.create(point).await?;
        if let Err(error) = self.cache.upsert_point(point).await {
            tracing::warn!("Failed to mirror created point {}: {error}", point.id);
        }
        Ok(())
    }

    async fn update(&self, point: &BorderPoint) -> Result<()> {
        self.remote.update(point).await?;
        if let Err(error) = self.cache.upsert_point(point).await {
            tracing::warn!("Failed to mirror updated point {}: {error}", point.id);
        }
        Ok(())
    }

    async fn soft_delete(&self, id: &BorderPointId, actor_id: &str) -> Result<()> {
        self.remote.soft_delete(id, actor_id).await?;
        match self.remote.get(id).await {
            Ok(Some(point)) => {
                if let Err(error) = self.cache.upsert_point(&point).await {
                    tracing::warn!("Failed to mirror deleted point {id}: {error}");
                }
            }
            // Remote copy unreadable; flag the cached row ourselves
            _ => {
                if let Err(error) = self
                    .cache
                    .soft_delete_point(id, actor_id, unix_millis_now())
                    .await
                {
                    tracing::warn!("Failed to mirror deletion of {id}: {error}");
                }
            }
        }
        Ok(())
    }

    fn subscribe_updates(&self, id: &BorderPointId) -> UpdatesStream {
        let cache = self.cache.clone();
        self.remote
            .subscribe_updates(id)
            .then(move |snapshot| {
                let cache = cache.clone();
                async move {
                    if let Ok(updates) = &snapshot {
                        if let Err(error) = cache.insert_updates(updates).await {
                            tracing::warn!("Failed to mirror updates: {error}");
                        }
                    }
                    snapshot
                }
            })
            .boxed()
    }

    async fn add_update(&self, update: &BorderUpdate) -> Result<()> {
        self.remote.add_update(update).await?;
        if let Err(error) = self.cache.insert_updates(std::slice::from_ref(update)).await {
            tracing::warn!("Failed to mirror update {}: {error}", update.id);
        }
        Ok(())
    }
}
