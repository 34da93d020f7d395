pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Single-connection SQLite handle. Every unit of work holds the lock for
/// its whole duration, so a `with_tx` body is never interleaved with
/// another request.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers from other processes
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private database that lives as long as the handle. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run read-only work against the connection.
    pub fn with_conn<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run `f` inside one transaction: committed when `f` returns `Ok`,
    /// rolled back on any error.
    pub fn with_tx<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        let tx = conn.transaction().map_err(anyhow::Error::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(anyhow::Error::from)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRow;
    use crate::queries;

    fn user(id: &str, name: &str) -> UserRow {
        UserRow {
            id: id.into(),
            username: name.into(),
            email: format!("{name}@example.com"),
            password: "hash".into(),
            role: "user".into(),
            created_at: "2024-01-01T00:00:00.000000Z".into(),
        }
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();

        let result: anyhow::Result<()> = db.with_tx(|conn| {
            queries::insert_user(conn, &user("u1", "alice"))?;
            Err(anyhow!("abort"))
        });
        assert!(result.is_err());

        let found: anyhow::Result<_> = db.with_conn(|conn| queries::user_by_username(conn, "alice"));
        assert!(found.unwrap().is_none());
    }

    #[test]
    fn committed_transaction_is_visible() {
        let db = Database::open_in_memory().unwrap();

        db.with_tx(|conn| queries::insert_user(conn, &user("u1", "alice")))
            .unwrap();

        let found: anyhow::Result<_> = db.with_conn(|conn| queries::user_by_id(conn, "u1"));
        assert_eq!(found.unwrap().unwrap().username, "alice");
    }
}
