//! Event store: CRUD gated by the access resolver.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use huddle_db::Database;
use huddle_db::queries;
use huddle_types::models::{Event, EventFields, EventPatch, User};

use crate::access;
use crate::convert::{event_from_row, event_to_row};
use crate::error::{CoreError, Result};
use crate::history;

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(CoreError::Invalid("title must not be blank".into()));
    }
    Ok(())
}

/// Stored instants are four-digit-year RFC 3339; anything wider would not
/// read back.
fn validate_timestamp(timestamp: &DateTime<Utc>) -> Result<()> {
    if !(0..=9999).contains(&timestamp.year()) {
        return Err(CoreError::Invalid("timestamp year must be between 0 and 9999".into()));
    }
    Ok(())
}

fn validate_fields(fields: &EventFields) -> Result<()> {
    validate_title(&fields.title)?;
    validate_timestamp(&fields.timestamp)
}

fn new_event(owner: &User, fields: EventFields) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: fields.title,
        description: fields.description,
        timestamp: fields.timestamp,
        owner_id: owner.id,
        created_at: now,
        updated_at: now,
    }
}

/// Load the live event. Callers resolve access first.
pub(crate) fn load_event(conn: &Connection, event_id: Uuid) -> Result<Event> {
    queries::event_by_id(conn, &event_id.to_string())?
        .map(event_from_row)
        .transpose()?
        .ok_or_else(|| CoreError::NotFound(format!("event {event_id}")))
}

/// Write every mutable field of `event` back to the store.
pub(crate) fn store_event(conn: &Connection, event: &Event) -> Result<()> {
    if queries::update_event(conn, &event_to_row(event))? == 0 {
        return Err(CoreError::NotFound(format!("event {}", event.id)));
    }
    Ok(())
}

pub fn create_event(db: &Database, owner: &User, fields: EventFields) -> Result<Event> {
    validate_fields(&fields)?;
    let event = new_event(owner, fields);

    db.with_tx(|conn| {
        queries::insert_event(conn, &event_to_row(&event))?;
        Ok::<_, CoreError>(())
    })?;

    info!("{} created event {}", owner.username, event.id);
    Ok(event)
}

/// Create all events in one transaction. Either every event is stored or
/// none is; the result keeps the input order.
pub fn create_events(db: &Database, owner: &User, batch: Vec<EventFields>) -> Result<Vec<Event>> {
    for fields in &batch {
        validate_fields(fields)?;
    }
    let events: Vec<Event> = batch.into_iter().map(|f| new_event(owner, f)).collect();

    db.with_tx(|conn| {
        for event in &events {
            queries::insert_event(conn, &event_to_row(event))?;
        }
        Ok::<_, CoreError>(())
    })?;

    info!("{} created {} events in a batch", owner.username, events.len());
    Ok(events)
}

/// Events the user owns. Events shared with the user are not listed.
pub fn list_owned(db: &Database, user: &User) -> Result<Vec<Event>> {
    db.with_conn(|conn| {
        queries::events_by_owner(conn, &user.id.to_string())?
            .into_iter()
            .map(event_from_row)
            .collect()
    })
}

pub fn get_event(db: &Database, user: &User, event_id: Uuid) -> Result<Event> {
    db.with_conn(|conn| {
        access::require_read(conn, user.id, event_id)?;
        load_event(conn, event_id)
    })
}

/// Apply only the supplied fields, after logging the prior state.
///
/// Role is checked before the patch is validated, and a rejected patch
/// leaves no snapshot behind.
pub fn update_event(db: &Database, user: &User, event_id: Uuid, patch: EventPatch) -> Result<Event> {
    let event = db.with_tx(|conn| {
        access::require_edit(conn, user.id, event_id)?;
        let mut event = load_event(conn, event_id)?;

        history::record_snapshot(conn, event_id, user.id, &event.fields())?;

        if let Some(title) = patch.title {
            validate_title(&title)?;
            event.title = title;
        }
        if let Some(description) = patch.description {
            event.description = description;
        }
        if let Some(timestamp) = patch.timestamp {
            validate_timestamp(&timestamp)?;
            event.timestamp = timestamp;
        }
        event.updated_at = Utc::now();

        store_event(conn, &event)?;
        Ok::<_, CoreError>(event)
    })?;

    info!("{} updated event {}", user.username, event_id);
    Ok(event)
}

/// Hard delete. History rows stay behind, keyed by the old event id.
pub fn delete_event(db: &Database, user: &User, event_id: Uuid) -> Result<()> {
    db.with_tx(|conn| {
        access::require_owner(conn, user.id, event_id)?;
        queries::delete_event(conn, &event_id.to_string())?;
        Ok::<_, CoreError>(())
    })?;

    info!("{} deleted event {}", user.username, event_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_types::models::SharedRole;

    use crate::sharing;
    use crate::testutil::{self, fields};

    #[test]
    fn creator_owns_and_lists_only_own_events() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");

        let late = create_event(&db, &alice, fields("Retro", "weekly", 15)).unwrap();
        let early = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();
        let bobs = create_event(&db, &bob, fields("Lunch", "", 12)).unwrap();
        sharing::share(&db, &bob, bobs.id, alice.id, SharedRole::Editor).unwrap();

        assert_eq!(late.owner_id, alice.id);
        let listed = list_owned(&db, &alice).unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[test]
    fn batch_is_ordered_and_atomic() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");

        let created = create_events(
            &db,
            &alice,
            vec![fields("One", "", 11), fields("Two", "", 10), fields("Three", "", 9)],
        )
        .unwrap();
        let titles: Vec<&str> = created.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        assert!(created.iter().all(|e| e.owner_id == alice.id));

        let rejected = create_events(&db, &alice, vec![fields("Four", "", 8), fields("  ", "", 8)]);
        assert!(matches!(rejected, Err(CoreError::Invalid(_))));
        assert_eq!(list_owned(&db, &alice).unwrap().len(), 3);

        assert!(create_events(&db, &alice, vec![]).unwrap().is_empty());
    }

    #[test]
    fn partial_update_touches_only_supplied_fields() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();

        let updated = update_event(
            &db,
            &alice,
            event.id,
            EventPatch {
                title: Some("Standup v2".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.title, "Standup v2");
        assert_eq!(updated.description, "daily");
        assert_eq!(updated.timestamp, event.timestamp);
        assert_eq!(get_event(&db, &alice, event.id).unwrap(), updated);
    }

    #[test]
    fn update_records_prior_state() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();

        update_event(
            &db,
            &alice,
            event.id,
            EventPatch {
                description: Some("every day".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let log = history::list_history(&db, &alice, event.id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].changed_by, alice.id);
        assert_eq!(log[0].previous_data["description"], "daily");
    }

    #[test]
    fn role_gates() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let carol = testutil::user(&db, "carol");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();
        sharing::share(&db, &alice, event.id, bob.id, SharedRole::Viewer).unwrap();

        let patch = EventPatch {
            title: Some("hijacked".into()),
            ..Default::default()
        };

        assert!(get_event(&db, &bob, event.id).is_ok());
        assert!(matches!(get_event(&db, &carol, event.id), Err(CoreError::NotFound(_))));
        assert!(matches!(
            update_event(&db, &bob, event.id, patch.clone()),
            Err(CoreError::Forbidden(_))
        ));

        sharing::share(&db, &alice, event.id, bob.id, SharedRole::Editor).unwrap();
        assert!(update_event(&db, &bob, event.id, patch).is_ok());
        assert!(matches!(delete_event(&db, &bob, event.id), Err(CoreError::Forbidden(_))));

        // The rejected viewer update left no snapshot behind.
        assert_eq!(history::list_history(&db, &alice, event.id).unwrap().len(), 1);
    }

    fn far_year() -> DateTime<Utc> {
        serde_json::from_str("\"+10000-01-01T00:00:00Z\"").unwrap()
    }

    #[test]
    fn out_of_range_years_are_rejected() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");

        let far = EventFields {
            timestamp: far_year(),
            ..fields("Launch", "", 9)
        };
        assert!(matches!(create_event(&db, &alice, far.clone()), Err(CoreError::Invalid(_))));
        assert!(matches!(
            create_events(&db, &alice, vec![fields("Ok", "", 9), far]),
            Err(CoreError::Invalid(_))
        ));

        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();
        let patch = EventPatch {
            timestamp: Some(far_year()),
            ..Default::default()
        };
        assert!(matches!(update_event(&db, &alice, event.id, patch), Err(CoreError::Invalid(_))));

        let listed = list_owned(&db, &alice).unwrap();
        assert_eq!(listed, vec![event]);
    }

    #[test]
    fn rejected_patch_rolls_back_its_snapshot() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();
        update_event(&db, &alice, event.id, EventPatch::default()).unwrap();

        let patch = EventPatch {
            description: Some("changed".into()),
            timestamp: Some(far_year()),
            ..Default::default()
        };
        assert!(update_event(&db, &alice, event.id, patch).is_err());

        assert_eq!(history::list_history(&db, &alice, event.id).unwrap().len(), 1);
        assert_eq!(get_event(&db, &alice, event.id).unwrap().description, "daily");
    }

    #[test]
    fn role_is_checked_before_the_patch() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let carol = testutil::user(&db, "carol");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();
        sharing::share(&db, &alice, event.id, bob.id, SharedRole::Viewer).unwrap();

        let blank = EventPatch {
            title: Some(" ".into()),
            ..Default::default()
        };
        assert!(matches!(
            update_event(&db, &bob, event.id, blank.clone()),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            update_event(&db, &carol, event.id, blank.clone()),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(update_event(&db, &alice, event.id, blank), Err(CoreError::Invalid(_))));
    }

    #[test]
    fn delete_keeps_history_and_hides_event() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();
        update_event(&db, &alice, event.id, EventPatch::default()).unwrap();

        delete_event(&db, &alice, event.id).unwrap();

        assert!(matches!(get_event(&db, &alice, event.id), Err(CoreError::NotFound(_))));
        assert!(matches!(delete_event(&db, &alice, event.id), Err(CoreError::NotFound(_))));

        let orphaned = db
            .with_conn(|conn| queries::history_for_event(conn, &event.id.to_string()))
            .unwrap();
        assert_eq!(orphaned.len(), 1);
    }
}
