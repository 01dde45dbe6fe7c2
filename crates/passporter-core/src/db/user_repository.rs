//! Current-user cache repository
//!
//! The table holds at most one row under a reserved key. Sign-in upserts that
//! row, sign-out deletes it.

use crate::error::Result;
use crate::models::User;
use libsql::{Connection, Value};

const CURRENT_USER_KEY: &str = "current";

/// Trait for the single-row current-user cache (async)
#[allow(async_fn_in_trait)]
pub trait UserRepository {
    /// Load the cached current user, if any
    async fn current(&self) -> Result<Option<User>>;

    /// Replace the cached current user wholesale
    async fn replace_current(&self, user: &User) -> Result<()>;

    /// Remove the cached current user
    async fn clear_current(&self) -> Result<()>;
}

/// libSQL implementation of `UserRepository`
pub struct LibSqlUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for LibSqlUserRepository<'_> {
    async fn current(&self) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                "SELECT payload FROM users WHERE key = ?",
                [CURRENT_USER_KEY],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let payload: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&payload)?))
        } else {
            Ok(None)
        }
    }

    async fn replace_current(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO users (key, id, payload, cached_at) VALUES (?, ?, ?, ?)",
                vec![
                    Value::Text(CURRENT_USER_KEY.to_string()),
                    Value::Text(user.id.clone()),
                    Value::Text(serde_json::to_string(user)?),
                    Value::Integer(crate::util::unix_millis_now()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn clear_current(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM users WHERE key = ?", [CURRENT_USER_KEY])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn row_count(db: &Database) -> i64 {
        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM users", ())
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get(0).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_cache_has_no_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlUserRepository::new(db.connection());
        assert!(repo.current().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_replace_keeps_single_row() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlUserRepository::new(db.connection());

        repo.replace_current(&User::new("u1", Some("one@example.com".into())))
            .await
            .unwrap();
        let second = User::new("u2", Some("two@example.com".into()));
        repo.replace_current(&second).await.unwrap();

        assert_eq!(row_count(&db).await, 1);
        assert_eq!(repo.current().await.unwrap(), Some(second));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_removes_row() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlUserRepository::new(db.connection());

        repo.replace_current(&User::new("u1", None)).await.unwrap();
        repo.clear_current().await.unwrap();

        assert_eq!(row_count(&db).await, 0);
        assert!(repo.current().await.unwrap().is_none());
    }
}
