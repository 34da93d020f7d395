//! Sharing manager: per-user grants on an event, managed by its owner.
//!
//! Every operation resolves the caller itself; a role claimed by the
//! caller is never trusted.

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use huddle_db::Database;
use huddle_db::models::SharedAccessRow;
use huddle_db::queries;
use huddle_types::models::{Permission, SharedRole, User};

use crate::access;
use crate::convert::{parse_shared_role, parse_uuid, to_db_time};
use crate::error::{CoreError, Result};

fn username_of(conn: &Connection, user_id: Uuid) -> Result<String> {
    queries::user_by_id(conn, &user_id.to_string())?
        .map(|row| row.username)
        .ok_or_else(|| CoreError::NotFound(format!("user {user_id}")))
}

/// Grant `role` to `target`, or overwrite the role of an existing grant.
pub fn share(
    db: &Database,
    owner: &User,
    event_id: Uuid,
    target: Uuid,
    role: SharedRole,
) -> Result<Permission> {
    let permission = db.with_tx(|conn| {
        access::require_sharing_owner(conn, owner.id, event_id)?;
        let username = username_of(conn, target)?;

        queries::upsert_shared_access(
            conn,
            &SharedAccessRow {
                id: Uuid::new_v4().to_string(),
                user_id: target.to_string(),
                event_id: event_id.to_string(),
                role: role.as_str().to_string(),
                created_at: to_db_time(Utc::now()),
            },
        )?;

        Ok::<_, CoreError>(Permission {
            user_id: target,
            username,
            role,
        })
    })?;

    info!(
        "{} shared event {} with {} as {}",
        owner.username,
        event_id,
        permission.username,
        role.as_str()
    );
    Ok(permission)
}

pub fn list_permissions(db: &Database, owner: &User, event_id: Uuid) -> Result<Vec<Permission>> {
    db.with_conn(|conn| {
        access::require_sharing_owner(conn, owner.id, event_id)?;
        queries::permissions_for_event(conn, &event_id.to_string())?
            .into_iter()
            .map(|row| -> Result<Permission> {
                Ok(Permission {
                    user_id: parse_uuid(&row.user_id)?,
                    role: parse_shared_role(&row.role)?,
                    username: row.username,
                })
            })
            .collect()
    })
}

/// Change the role of an existing grant. Fails if the user has none.
pub fn update_permission(
    db: &Database,
    owner: &User,
    event_id: Uuid,
    target: Uuid,
    role: SharedRole,
) -> Result<Permission> {
    let permission = db.with_tx(|conn| {
        access::require_sharing_owner(conn, owner.id, event_id)?;

        let changed = queries::update_shared_role(
            conn,
            &event_id.to_string(),
            &target.to_string(),
            role.as_str(),
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound(format!("shared access for user {target}")));
        }

        Ok(Permission {
            user_id: target,
            username: username_of(conn, target)?,
            role,
        })
    })?;

    info!(
        "{} changed {}'s role on event {} to {}",
        owner.username,
        permission.username,
        event_id,
        role.as_str()
    );
    Ok(permission)
}

pub fn revoke(db: &Database, owner: &User, event_id: Uuid, target: Uuid) -> Result<()> {
    db.with_tx(|conn| {
        access::require_sharing_owner(conn, owner.id, event_id)?;

        let removed =
            queries::delete_shared_access(conn, &event_id.to_string(), &target.to_string())?;
        if removed == 0 {
            return Err(CoreError::NotFound(format!("shared access for user {target}")));
        }
        Ok(())
    })?;

    info!("{} revoked {}'s access to event {}", owner.username, target, event_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{create_event, get_event};
    use crate::testutil::{self, fields};
    use crate::Access;

    #[test]
    fn sharing_twice_keeps_one_row() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();

        share(&db, &alice, event.id, bob.id, SharedRole::Editor).unwrap();
        share(&db, &alice, event.id, bob.id, SharedRole::Editor).unwrap();

        let listed = list_permissions(&db, &alice, event.id).unwrap();
        assert_eq!(
            listed,
            vec![Permission {
                user_id: bob.id,
                username: "bob".into(),
                role: SharedRole::Editor,
            }]
        );
    }

    #[test]
    fn share_overwrites_existing_role() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();

        share(&db, &alice, event.id, bob.id, SharedRole::Editor).unwrap();
        share(&db, &alice, event.id, bob.id, SharedRole::Viewer).unwrap();

        let access = db
            .with_conn(|conn| access::resolve(conn, bob.id, event.id))
            .unwrap();
        assert_eq!(access, Access::Viewer);
    }

    #[test]
    fn only_the_owner_manages_sharing() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let carol = testutil::user(&db, "carol");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();
        share(&db, &alice, event.id, bob.id, SharedRole::Editor).unwrap();

        let forbidden = |r: Result<_>| matches!(r, Err(CoreError::Forbidden(_)));
        assert!(forbidden(share(&db, &bob, event.id, carol.id, SharedRole::Viewer).map(|_| ())));
        assert!(forbidden(list_permissions(&db, &bob, event.id).map(|_| ())));
        assert!(forbidden(
            update_permission(&db, &bob, event.id, bob.id, SharedRole::Viewer).map(|_| ())
        ));
        assert!(forbidden(revoke(&db, &bob, event.id, bob.id)));
        assert!(forbidden(
            share(&db, &alice, Uuid::new_v4(), bob.id, SharedRole::Viewer).map(|_| ())
        ));
    }

    #[test]
    fn unknown_target_user_is_not_found() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();

        let result = share(&db, &alice, event.id, Uuid::new_v4(), SharedRole::Viewer);
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn update_and_revoke_need_an_existing_grant() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let event = create_event(&db, &alice, fields("Standup", "daily", 9)).unwrap();

        assert!(matches!(
            update_permission(&db, &alice, event.id, bob.id, SharedRole::Editor),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(revoke(&db, &alice, event.id, bob.id), Err(CoreError::NotFound(_))));

        share(&db, &alice, event.id, bob.id, SharedRole::Viewer).unwrap();
        let updated = update_permission(&db, &alice, event.id, bob.id, SharedRole::Editor).unwrap();
        assert_eq!(updated.role, SharedRole::Editor);

        revoke(&db, &alice, event.id, bob.id).unwrap();
        assert!(list_permissions(&db, &alice, event.id).unwrap().is_empty());
        assert!(matches!(get_event(&db, &bob, event.id), Err(CoreError::NotFound(_))));
    }
}
