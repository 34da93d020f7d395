//! Version log: append-only snapshots of an event's prior state.
//!
//! A snapshot is written before every update and every rollback, in the
//! transaction that applies the change. Entries are never rewritten or
//! removed, and they outlive the event they describe.
//!
//! Concurrent edits are not reconciled: two updates racing on the same
//! event both log their own prior state and the last commit wins.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use chrono::{Duration, Utc};
use rusqlite::Connection;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use huddle_db::Database;
use huddle_db::models::HistoryRow;
use huddle_db::queries;
use huddle_types::models::{
    Event, EventFields, FieldChange, HistoryEntry, User, VersionDiff, VersionStamp,
};

use crate::access;
use crate::convert::{history_from_row, parse_time, to_db_time};
use crate::error::{CoreError, Result};
use crate::events::{load_event, store_event};

/// Outcome of a rollback: the restored event and the entry that preserved
/// the state it replaced.
#[derive(Debug, Clone)]
pub struct Rollback {
    pub event: Event,
    pub recorded: HistoryEntry,
}

/// Append the pre-change state of an event. Only fails if the store does.
///
/// Versions count up from 1 per event, and `change_time` is forced to move
/// forward even if the wall clock does not.
pub fn record_snapshot(
    conn: &Connection,
    event_id: Uuid,
    changed_by: Uuid,
    prior: &EventFields,
) -> Result<HistoryEntry> {
    let event_key = event_id.to_string();

    let mut change_time = Utc::now();
    let mut version = 1;
    if let Some((last_version, last_time)) = queries::latest_history_stamp(conn, &event_key)? {
        version = last_version + 1;
        let last_time = parse_time(&last_time)?;
        if change_time <= last_time {
            change_time = last_time + Duration::microseconds(1);
        }
    }

    let previous_data = match serde_json::to_value(prior).context("serialize snapshot")? {
        Value::Object(map) => map,
        other => return Err(anyhow::anyhow!("snapshot is not an object: {other}").into()),
    };

    let entry = HistoryEntry {
        id: Uuid::new_v4(),
        event_id,
        version,
        changed_by,
        change_time,
        previous_data,
    };

    queries::insert_history(
        conn,
        &HistoryRow {
            id: entry.id.to_string(),
            event_id: event_key,
            version,
            changed_by: changed_by.to_string(),
            change_time: to_db_time(change_time),
            previous_data: Value::Object(entry.previous_data.clone()).to_string(),
        },
    )?;

    Ok(entry)
}

fn load_entry(conn: &Connection, event_id: Uuid, version_id: Uuid) -> Result<HistoryEntry> {
    queries::history_entry(conn, &event_id.to_string(), &version_id.to_string())?
        .map(history_from_row)
        .transpose()?
        .ok_or_else(|| CoreError::NotFound(format!("version {version_id} of event {event_id}")))
}

/// The full change log, oldest first.
pub fn list_history(db: &Database, user: &User, event_id: Uuid) -> Result<Vec<HistoryEntry>> {
    db.with_conn(|conn| {
        access::require_read(conn, user.id, event_id)?;
        queries::history_for_event(conn, &event_id.to_string())?
            .into_iter()
            .map(history_from_row)
            .collect()
    })
}

/// One entry, only if it belongs to `event_id`. An id from another event
/// is reported as not found.
pub fn get_version(db: &Database, user: &User, event_id: Uuid, version_id: Uuid) -> Result<HistoryEntry> {
    db.with_conn(|conn| {
        access::require_read(conn, user.id, event_id)?;
        load_entry(conn, event_id, version_id)
    })
}

/// Keys whose values differ between two payloads. A key present on one
/// side only is compared against `null`.
pub fn diff_payloads(
    version1: &Map<String, Value>,
    version2: &Map<String, Value>,
) -> BTreeMap<String, FieldChange> {
    let keys: BTreeSet<&String> = version1.keys().chain(version2.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let v1 = version1.get(key).cloned().unwrap_or(Value::Null);
            let v2 = version2.get(key).cloned().unwrap_or(Value::Null);
            (v1 != v2).then(|| (key.clone(), FieldChange { version1: v1, version2: v2 }))
        })
        .collect()
}

pub fn diff(
    db: &Database,
    user: &User,
    event_id: Uuid,
    version1_id: Uuid,
    version2_id: Uuid,
) -> Result<VersionDiff> {
    db.with_conn(|conn| {
        access::require_read(conn, user.id, event_id)?;
        let v1 = load_entry(conn, event_id, version1_id)?;
        let v2 = load_entry(conn, event_id, version2_id)?;

        Ok(VersionDiff {
            event_id,
            changes: diff_payloads(&v1.previous_data, &v2.previous_data),
            version1: VersionStamp {
                id: v1.id,
                version: v1.version,
                change_time: v1.change_time,
            },
            version2: VersionStamp {
                id: v2.id,
                version: v2.version,
                change_time: v2.change_time,
            },
        })
    })
}

/// Owner-only. Logs the current state, then overwrites every field with the
/// chosen snapshot.
pub fn rollback(db: &Database, user: &User, event_id: Uuid, version_id: Uuid) -> Result<Rollback> {
    let outcome = db.with_tx(|conn| {
        access::require_owner(conn, user.id, event_id)?;
        let mut event = load_event(conn, event_id)?;
        let target = load_entry(conn, event_id, version_id)?;

        let restored: EventFields = serde_json::from_value(Value::Object(target.previous_data))
            .with_context(|| format!("snapshot {version_id} does not hold event fields"))?;

        let recorded = record_snapshot(conn, event_id, user.id, &event.fields())?;

        event.title = restored.title;
        event.description = restored.description;
        event.timestamp = restored.timestamp;
        event.updated_at = Utc::now();
        store_event(conn, &event)?;

        Ok::<_, CoreError>(Rollback { event, recorded })
    })?;

    info!(
        "{} rolled event {} back to {} (previous state kept as {})",
        user.username, event_id, version_id, outcome.recorded.id
    );
    Ok(outcome)
}
