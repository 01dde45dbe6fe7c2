//! Shared cache service wrapper used by the store mirror and auth gateway.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    BorderPointRepository, BorderUpdateRepository, Database, LibSqlBorderPointRepository,
    LibSqlBorderUpdateRepository, LibSqlUserRepository, UserRepository,
};
use crate::models::{BorderPoint, BorderPointId, BorderUpdate, LatLngBounds, User};
use crate::Result;

/// Thread-safe handle to the local cache.
#[derive(Clone)]
pub struct CacheService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl CacheService {
    /// Open the cache at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let db = Database::open(&db_path).await?;
        tracing::info!("Using local cache at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory cache (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location of the cache, `None` when in memory.
    pub fn path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Mirror a single point.
    pub async fn upsert_point(&self, point: &BorderPoint) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderPointRepository::new(db.connection());
        repo.upsert(point).await
    }

    /// Mirror every point of a subscription emission.
    pub async fn upsert_points(&self, points: &[BorderPoint]) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderPointRepository::new(db.connection());
        repo.upsert_many(points).await
    }

    /// Fetch a cached point by id.
    pub async fn get_point(&self, id: &BorderPointId) -> Result<Option<BorderPoint>> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderPointRepository::new(db.connection());
        repo.get(id).await
    }

    /// List cached non-deleted points.
    pub async fn list_points(&self, limit: usize, offset: usize) -> Result<Vec<BorderPoint>> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderPointRepository::new(db.connection());
        repo.list(limit, offset).await
    }

    /// List cached non-deleted points inside a viewport.
    pub async fn list_points_within(&self, bounds: &LatLngBounds) -> Result<Vec<BorderPoint>> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderPointRepository::new(db.connection());
        repo.list_within(bounds).await
    }

    /// IDs of every cached non-deleted point.
    pub async fn list_point_ids(&self) -> Result<Vec<BorderPointId>> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderPointRepository::new(db.connection());
        repo.list_ids().await
    }

    /// Drop a cached point that no longer exists remotely.
    pub async fn remove_point(&self, id: &BorderPointId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderPointRepository::new(db.connection());
        repo.remove(id).await
    }

    /// Soft-delete a cached point.
    pub async fn soft_delete_point(
        &self,
        id: &BorderPointId,
        actor_id: &str,
        at: i64,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderPointRepository::new(db.connection());
        repo.soft_delete(id, actor_id, at).await
    }

    /// Mirror status updates.
    pub async fn insert_updates(&self, updates: &[BorderUpdate]) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderUpdateRepository::new(db.connection());
        for update in updates {
            repo.insert(update).await?;
        }
        Ok(())
    }

    /// List cached status updates for a point, newest first.
    pub async fn list_updates(
        &self,
        id: &BorderPointId,
        limit: usize,
    ) -> Result<Vec<BorderUpdate>> {
        let db = self.db.lock().await;
        let repo = LibSqlBorderUpdateRepository::new(db.connection());
        repo.list_for_point(id, limit).await
    }

    /// Load the cached session user.
    pub async fn current_user(&self) -> Result<Option<User>> {
        let db = self.db.lock().await;
        let repo = LibSqlUserRepository::new(db.connection());
        repo.current().await
    }

    /// Replace the cached session user.
    pub async fn replace_current_user(&self, user: &User) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlUserRepository::new(db.connection());
        repo.replace_current(user).await
    }

    /// Clear the cached session user.
    pub async fn clear_current_user(&self) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlUserRepository::new(db.connection());
        repo.clear_current().await
    }
}
