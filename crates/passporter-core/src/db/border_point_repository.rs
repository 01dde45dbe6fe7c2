//! Border point cache repository

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use crate::error::{Error, Result};
use crate::models::{BorderPoint, BorderPointId, LatLngBounds};
use libsql::{Connection, Value};

/// Trait for border point cache operations (async)
#[allow(async_fn_in_trait)]
pub trait BorderPointRepository {
    /// Insert or replace a point (full-record replace)
    async fn upsert(&self, point: &BorderPoint) -> Result<()>;

    /// Insert or replace several points in one transaction
    async fn upsert_many(&self, points: &[BorderPoint]) -> Result<()>;

    /// Get a point by ID, including soft-deleted ones
    async fn get(&self, id: &BorderPointId) -> Result<Option<BorderPoint>>;

    /// List non-deleted points, most recently updated first
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<BorderPoint>>;

    /// List non-deleted points inside a viewport
    async fn list_within(&self, bounds: &LatLngBounds) -> Result<Vec<BorderPoint>>;

    /// IDs of every non-deleted point
    async fn list_ids(&self) -> Result<Vec<BorderPointId>>;

    /// Soft delete a point
    async fn soft_delete(&self, id: &BorderPointId, actor_id: &str, at: i64) -> Result<()>;

    /// Drop a row outright; missing rows are ignored
    async fn remove(&self, id: &BorderPointId) -> Result<()>;
}

/// libSQL implementation of `BorderPointRepository`
pub struct LibSqlBorderPointRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlBorderPointRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn upsert_params(point: &BorderPoint) -> Result<Vec<Value>> {
        Ok(vec![
            Value::Text(point.id.to_string()),
            Value::Real(point.latitude),
            Value::Real(point.longitude),
            Value::Text(point.status.as_str().to_string()),
            Value::Integer(i64::from(point.deleted)),
            Value::Integer(point.updated_at),
            Value::Text(serde_json::to_string(point)?),
        ])
    }

    async fn upsert_inner(&self, point: &BorderPoint) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO border_points
                    (id, latitude, longitude, status, deleted, updated_at, payload)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                Self::upsert_params(point)?,
            )
            .await?;
        Ok(())
    }

    async fn collect(mut rows: libsql::Rows) -> Result<Vec<BorderPoint>> {
        let mut points = Vec::new();
        while let Some(row) = rows.next().await? {
            let payload: String = row.get(0)?;
            points.push(serde_json::from_str(&payload)?);
        }
        Ok(points)
    }
}

impl BorderPointRepository for LibSqlBorderPointRepository<'_> {
    async fn upsert(&self, point: &BorderPoint) -> Result<()> {
        self.upsert_inner(point).await
    }

    async fn upsert_many(&self, points: &[BorderPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        for point in points {
            if let Err(e) = self.upsert_inner(point).await {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        }
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok(())
    }

    async fn get(&self, id: &BorderPointId) -> Result<Option<BorderPoint>> {
        let mut rows = self
            .conn
            .query(
                "SELECT payload FROM border_points WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let payload: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&payload)?))
        } else {
            Ok(None)
        }
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<BorderPoint>> {
        let rows = self
            .conn
            .query(
                "SELECT payload FROM border_points
                 WHERE deleted = 0
                 ORDER BY updated_at DESC
                 LIMIT ? OFFSET ?",
                vec![Value::Integer(limit as i64), Value::Integer(offset as i64)],
            )
            .await?;
        Self::collect(rows).await
    }

    async fn list_within(&self, bounds: &LatLngBounds) -> Result<Vec<BorderPoint>> {
        let sql = if bounds.crosses_antimeridian() {
            "SELECT payload FROM border_points
             WHERE deleted = 0
               AND latitude BETWEEN ? AND ?
               AND (longitude >= ? OR longitude <= ?)"
        } else {
            "SELECT payload FROM border_points
             WHERE deleted = 0
               AND latitude BETWEEN ? AND ?
               AND longitude BETWEEN ? AND ?"
        };
        let rows = self
            .conn
            .query(
                sql,
                vec![
                    Value::Real(bounds.south_west.latitude),
                    Value::Real(bounds.north_east.latitude),
                    Value::Real(bounds.south_west.longitude),
                    Value::Real(bounds.north_east.longitude),
                ],
            )
            .await?;
        Self::collect(rows).await
    }

    async fn soft_delete(&self, id: &BorderPointId, actor_id: &str, at: i64) -> Result<()> {
        let mut point = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        if point.deleted {
            return Ok(());
        }
        point.mark_deleted(actor_id, at);
        self.upsert_inner(&point).await
    }

    async fn list_ids(&self) -> Result<Vec<BorderPointId>> {
        let mut rows = self
            .conn
            .query("SELECT id FROM border_points WHERE deleted = 0", ())
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            ids.push(BorderPointId::from(id.as_str()));
        }
        Ok(ids)
    }

    async fn remove(&self, id: &BorderPointId) -> Result<()> {
        self.conn
            .execute("DELETE FROM border_points WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }
}
