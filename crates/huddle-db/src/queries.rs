use crate::models::{EventRow, HistoryRow, PermissionRow, SharedAccessRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

// Every query takes a plain `&Connection` so callers can compose several of
// them inside one `Database::with_tx` unit of work.

// -- Users --

pub fn insert_user(conn: &Connection, user: &UserRow) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, email, password, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            user.id,
            user.username,
            user.email,
            user.password,
            user.role,
            user.created_at
        ],
    )?;
    Ok(())
}

pub fn user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    query_user(conn, "username", username)
}

pub fn user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    query_user(conn, "email", email)
}

pub fn user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    query_user(conn, "id", id)
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password, role, created_at FROM users WHERE {column} = ?1"
    );
    let row = conn
        .query_row(&sql, [value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

// -- Events --

const EVENT_COLUMNS: &str = "id, title, description, timestamp, owner_id, created_at, updated_at";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        timestamp: row.get(3)?,
        owner_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn insert_event(conn: &Connection, event: &EventRow) -> Result<()> {
    conn.execute(
        "INSERT INTO events (id, title, description, timestamp, owner_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            event.id,
            event.title,
            event.description,
            event.timestamp,
            event.owner_id,
            event.created_at,
            event.updated_at
        ],
    )?;
    Ok(())
}

pub fn event_by_id(conn: &Connection, id: &str) -> Result<Option<EventRow>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], event_from_row).optional()?)
}

pub fn events_by_owner(conn: &Connection, owner_id: &str) -> Result<Vec<EventRow>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE owner_id = ?1 ORDER BY timestamp, created_at"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([owner_id], event_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn event_owner(conn: &Connection, event_id: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT owner_id FROM events WHERE id = ?1", [event_id], |row| row.get(0))
        .optional()?)
}

/// Overwrite the mutable columns. Returns the number of rows touched.
pub fn update_event(conn: &Connection, event: &EventRow) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE events SET title = ?2, description = ?3, timestamp = ?4, updated_at = ?5
         WHERE id = ?1",
        rusqlite::params![
            event.id,
            event.title,
            event.description,
            event.timestamp,
            event.updated_at
        ],
    )?;
    Ok(changed)
}

pub fn delete_event(conn: &Connection, id: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM events WHERE id = ?1", [id])?)
}

// -- Shared access --

pub fn shared_role(conn: &Connection, user_id: &str, event_id: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT role FROM shared_access WHERE user_id = ?1 AND event_id = ?2",
            [user_id, event_id],
            |row| row.get(0),
        )
        .optional()?)
}

/// Insert a grant, or overwrite the role of the existing (user, event) grant.
pub fn upsert_shared_access(conn: &Connection, access: &SharedAccessRow) -> Result<()> {
    conn.execute(
        "INSERT INTO shared_access (id, user_id, event_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, event_id) DO UPDATE SET role = excluded.role",
        rusqlite::params![
            access.id,
            access.user_id,
            access.event_id,
            access.role,
            access.created_at
        ],
    )?;
    Ok(())
}

pub fn update_shared_role(
    conn: &Connection,
    event_id: &str,
    user_id: &str,
    role: &str,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE shared_access SET role = ?3 WHERE event_id = ?1 AND user_id = ?2",
        [event_id, user_id, role],
    )?)
}

pub fn delete_shared_access(conn: &Connection, event_id: &str, user_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM shared_access WHERE event_id = ?1 AND user_id = ?2",
        [event_id, user_id],
    )?)
}

pub fn permissions_for_event(conn: &Connection, event_id: &str) -> Result<Vec<PermissionRow>> {
    // JOIN users to return the grantee's username in one query
    let mut stmt = conn.prepare(
        "SELECT s.user_id, u.username, s.role
         FROM shared_access s
         JOIN users u ON s.user_id = u.id
         WHERE s.event_id = ?1
         ORDER BY u.username",
    )?;
    let rows = stmt
        .query_map([event_id], |row| {
            Ok(PermissionRow {
                user_id: row.get(0)?,
                username: row.get(1)?,
                role: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- History --

const HISTORY_COLUMNS: &str = "id, event_id, version, changed_by, change_time, previous_data";

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok(HistoryRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        version: row.get(2)?,
        changed_by: row.get(3)?,
        change_time: row.get(4)?,
        previous_data: row.get(5)?,
    })
}

pub fn insert_history(conn: &Connection, entry: &HistoryRow) -> Result<()> {
    conn.execute(
        "INSERT INTO event_history (id, event_id, version, changed_by, change_time, previous_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            entry.id,
            entry.event_id,
            entry.version,
            entry.changed_by,
            entry.change_time,
            entry.previous_data
        ],
    )?;
    Ok(())
}

/// Version and change time of the newest entry for an event.
pub fn latest_history_stamp(conn: &Connection, event_id: &str) -> Result<Option<(i64, String)>> {
    Ok(conn
        .query_row(
            "SELECT version, change_time FROM event_history
             WHERE event_id = ?1 ORDER BY version DESC LIMIT 1",
            [event_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

pub fn history_for_event(conn: &Connection, event_id: &str) -> Result<Vec<HistoryRow>> {
    let sql = format!(
        "SELECT {HISTORY_COLUMNS} FROM event_history
         WHERE event_id = ?1 ORDER BY change_time, version"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([event_id], history_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Fetch one entry, only if it belongs to `event_id`.
pub fn history_entry(conn: &Connection, event_id: &str, id: &str) -> Result<Option<HistoryRow>> {
    let sql = format!("SELECT {HISTORY_COLUMNS} FROM event_history WHERE id = ?1 AND event_id = ?2");
    Ok(conn.query_row(&sql, [id, event_id], history_from_row).optional()?)
}
