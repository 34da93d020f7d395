use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'user'
                            CHECK (role IN ('admin', 'auditor', 'user')),
                created_at  TEXT NOT NULL
            );

            CREATE TABLE events (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                timestamp   TEXT NOT NULL,
                owner_id    TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_events_owner
                ON events(owner_id, timestamp);

            CREATE TABLE shared_access (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                role        TEXT NOT NULL CHECK (role IN ('editor', 'viewer')),
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, event_id)
            );

            CREATE INDEX idx_shared_access_event
                ON shared_access(event_id);

            -- No foreign key on event_id: history outlives a deleted event.
            CREATE TABLE event_history (
                id              TEXT PRIMARY KEY,
                event_id        TEXT NOT NULL,
                version         INTEGER NOT NULL,
                changed_by      TEXT NOT NULL REFERENCES users(id),
                change_time     TEXT NOT NULL,
                previous_data   TEXT NOT NULL,
                UNIQUE(event_id, version)
            );

            CREATE TRIGGER event_history_no_update
                BEFORE UPDATE ON event_history
                BEGIN SELECT RAISE(ABORT, 'event_history is append-only'); END;

            CREATE TRIGGER event_history_no_delete
                BEFORE DELETE ON event_history
                BEGIN SELECT RAISE(ABORT, 'event_history is append-only'); END;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn history_rejects_update_and_delete() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, username, email, password, created_at)
                 VALUES ('u1', 'alice', 'a@example.com', 'x', 'now');
             INSERT INTO event_history (id, event_id, version, changed_by, change_time, previous_data)
                 VALUES ('h1', 'e1', 1, 'u1', 'now', '{}');",
        )
        .unwrap();

        assert!(conn.execute("UPDATE event_history SET previous_data = 'x'", []).is_err());
        assert!(conn.execute("DELETE FROM event_history", []).is_err());
    }
}
