//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        apply(conn, 1, &V1_STATEMENTS).await?;
    }
    if version < 2 {
        apply(conn, 2, &V2_STATEMENTS).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Version 1: border point mirror
const V1_STATEMENTS: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    // Queryable columns are duplicated out of the JSON payload
    "CREATE TABLE IF NOT EXISTS border_points (
        id TEXT PRIMARY KEY,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        status TEXT NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL,
        payload TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_border_points_lat_lng ON border_points(latitude, longitude)",
    "CREATE INDEX IF NOT EXISTS idx_border_points_deleted ON border_points(deleted)",
    "CREATE INDEX IF NOT EXISTS idx_border_points_updated ON border_points(updated_at DESC)",
    "INSERT INTO schema_version (version) VALUES (1)",
];

/// Version 2: status updates and the current-user row
const V2_STATEMENTS: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS border_updates (
        id TEXT PRIMARY KEY,
        border_point_id TEXT NOT NULL,
        status TEXT NOT NULL,
        message TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        reporter_id TEXT NOT NULL,
        reporter_name TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_border_updates_point_time
        ON border_updates(border_point_id, timestamp DESC)",
    // At most one row, keyed by a reserved singleton key
    "CREATE TABLE IF NOT EXISTS users (
        key TEXT PRIMARY KEY,
        id TEXT NOT NULL,
        payload TEXT NOT NULL,
        cached_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_users_id ON users(id)",
    "INSERT INTO schema_version (version) VALUES (2)",
];

/// Apply one migration inside a transaction
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated cache database to version {version} of {CURRENT_VERSION}");
    Ok(())
}
