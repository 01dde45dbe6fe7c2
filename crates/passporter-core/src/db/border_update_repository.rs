//! Border update cache repository

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::Result;
use crate::models::{BorderPointId, BorderUpdate};
use libsql::{Connection, Value};

/// Trait for border update cache operations (async)
#[allow(async_fn_in_trait)]
pub trait BorderUpdateRepository {
    /// Insert an update; re-inserting the same id is a no-op
    async fn insert(&self, update: &BorderUpdate) -> Result<()>;

    /// List updates for one point, newest first
    async fn list_for_point(&self, id: &BorderPointId, limit: usize)
        -> Result<Vec<BorderUpdate>>;
}

/// libSQL implementation of `BorderUpdateRepository`
pub struct LibSqlBorderUpdateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlBorderUpdateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_update(row: &libsql::Row) -> Result<BorderUpdate> {
        let status: String = row.get(2)?;
        let reporter_name = match row.get_value(6)? {
            Value::Text(name) => Some(name),
            _ => None,
        };
        Ok(BorderUpdate {
            id: row.get(0)?,
            border_point_id: BorderPointId::from(row.get::<String>(1)?.as_str()),
            status: status.parse().unwrap_or_default(),
            message: row.get(3)?,
            timestamp: row.get(4)?,
            reporter_id: row.get(5)?,
            reporter_name,
        })
    }
}

impl BorderUpdateRepository for LibSqlBorderUpdateRepository<'_> {
    async fn insert(&self, update: &BorderUpdate) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO border_updates
                    (id, border_point_id, status, message, timestamp, reporter_id, reporter_name)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                vec![
                    Value::Text(update.id.clone()),
                    Value::Text(update.border_point_id.to_string()),
                    Value::Text(update.status.as_str().to_string()),
                    Value::Text(update.message.clone()),
                    Value::Integer(update.timestamp),
                    Value::Text(update.reporter_id.clone()),
                    update.reporter_name.clone().map_or(Value::Null, Value::Text),
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_for_point(
        &self,
        id: &BorderPointId,
        limit: usize,
    ) -> Result<Vec<BorderUpdate>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, border_point_id, status, message, timestamp, reporter_id, reporter_name
                 FROM border_updates
                 WHERE border_point_id = ?
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?",
                vec![Value::Text(id.to_string()), Value::Integer(limit as i64)],
            )
            .await?;

        let mut updates = Vec::new();
        while let Some(row) = rows.next().await? {
            updates.push(Self::parse_update(&row)?);
        }
        Ok(updates)
    }
}
