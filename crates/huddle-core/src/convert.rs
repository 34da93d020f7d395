use anyhow::{Context, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use huddle_db::models::{EventRow, HistoryRow, UserRow};
use huddle_types::models::{Event, GlobalRole, HistoryEntry, SharedRole, User};

use crate::error::Result;

/// Fixed-width RFC 3339, so stored instants sort lexically in time order.
pub fn to_db_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    let t = DateTime::parse_from_rfc3339(s).with_context(|| format!("corrupt instant '{s}'"))?;
    Ok(t.with_timezone(&Utc))
}

pub fn parse_uuid(s: &str) -> Result<Uuid> {
    Ok(s.parse::<Uuid>().with_context(|| format!("corrupt id '{s}'"))?)
}

pub fn parse_shared_role(s: &str) -> Result<SharedRole> {
    Ok(SharedRole::parse(s).ok_or_else(|| anyhow!("corrupt shared role '{s}'"))?)
}

pub fn user_from_row(row: UserRow) -> Result<User> {
    Ok(User {
        id: parse_uuid(&row.id)?,
        role: GlobalRole::parse(&row.role)
            .ok_or_else(|| anyhow!("corrupt role '{}' on user '{}'", row.role, row.id))?,
        created_at: parse_time(&row.created_at)?,
        username: row.username,
        email: row.email,
    })
}

pub fn event_from_row(row: EventRow) -> Result<Event> {
    Ok(Event {
        id: parse_uuid(&row.id)?,
        timestamp: parse_time(&row.timestamp)?,
        owner_id: parse_uuid(&row.owner_id)?,
        created_at: parse_time(&row.created_at)?,
        updated_at: parse_time(&row.updated_at)?,
        title: row.title,
        description: row.description,
    })
}

pub fn event_to_row(event: &Event) -> EventRow {
    EventRow {
        id: event.id.to_string(),
        title: event.title.clone(),
        description: event.description.clone(),
        timestamp: to_db_time(event.timestamp),
        owner_id: event.owner_id.to_string(),
        created_at: to_db_time(event.created_at),
        updated_at: to_db_time(event.updated_at),
    }
}

pub fn history_from_row(row: HistoryRow) -> Result<HistoryEntry> {
    let previous_data: Map<String, Value> = serde_json::from_str(&row.previous_data)
        .with_context(|| format!("corrupt snapshot payload on '{}'", row.id))?;

    Ok(HistoryEntry {
        id: parse_uuid(&row.id)?,
        event_id: parse_uuid(&row.event_id)?,
        version: row.version,
        changed_by: parse_uuid(&row.changed_by)?,
        change_time: parse_time(&row.change_time)?,
        previous_data,
    })
}
