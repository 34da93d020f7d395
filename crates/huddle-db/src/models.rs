/// Database row types. These map directly to SQLite rows.
/// Distinct from huddle-types models to keep the DB layer independent.
/// Ids are UUID strings, instants are RFC 3339 strings.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub timestamp: String,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct SharedAccessRow {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub role: String,
    pub created_at: String,
}

/// Shared access joined with the grantee's username.
#[derive(Debug, Clone)]
pub struct PermissionRow {
    pub user_id: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub id: String,
    pub event_id: String,
    pub version: i64,
    pub changed_by: String,
    pub change_time: String,
    pub previous_data: String,
}
