//! Identity store: user records and their credential hashes.
//!
//! Hashing and token handling live at the API edge; this module only stores
//! and looks up what they produce.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use huddle_db::Database;
use huddle_db::models::UserRow;
use huddle_db::queries;
use huddle_types::models::{GlobalRole, User};

use crate::convert::{to_db_time, user_from_row};
use crate::error::{CoreError, Result};

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub credential_hash: String,
    pub role: GlobalRole,
}

/// A user together with the stored credential hash, for login checks.
pub struct StoredCredentials {
    pub user: User,
    pub credential_hash: String,
}

pub fn register(db: &Database, new: NewUser) -> Result<User> {
    db.with_tx(|conn| {
        if queries::user_by_username(conn, &new.username)?.is_some() {
            return Err(CoreError::Conflict("username already taken".into()));
        }
        if queries::user_by_email(conn, &new.email)?.is_some() {
            return Err(CoreError::Conflict("email already registered".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            role: new.role,
            created_at: Utc::now(),
        };

        queries::insert_user(
            conn,
            &UserRow {
                id: user.id.to_string(),
                username: user.username.clone(),
                email: user.email.clone(),
                password: new.credential_hash,
                role: user.role.as_str().to_string(),
                created_at: to_db_time(user.created_at),
            },
        )?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    })
}

pub fn find_by_username(db: &Database, username: &str) -> Result<Option<StoredCredentials>> {
    db.with_conn(|conn| {
        let Some(row) = queries::user_by_username(conn, username)? else {
            return Ok(None);
        };
        let credential_hash = row.password.clone();
        Ok(Some(StoredCredentials {
            user: user_from_row(row)?,
            credential_hash,
        }))
    })
}

pub fn find_by_id(db: &Database, id: Uuid) -> Result<Option<User>> {
    db.with_conn(|conn| {
        queries::user_by_id(conn, &id.to_string())?
            .map(user_from_row)
            .transpose()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            credential_hash: "hash".into(),
            role: GlobalRole::Auditor,
        }
    }

    #[test]
    fn register_then_lookup() {
        let db = testutil::db();
        let user = register(&db, new_user("alice", "alice@example.com")).unwrap();

        let stored = find_by_username(&db, "alice").unwrap().unwrap();
        assert_eq!(stored.user, user);
        assert_eq!(stored.credential_hash, "hash");
        assert_eq!(stored.user.role, GlobalRole::Auditor);

        assert_eq!(find_by_id(&db, user.id).unwrap(), Some(user));
        assert!(find_by_id(&db, Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_or_email_conflicts() {
        let db = testutil::db();
        register(&db, new_user("alice", "alice@example.com")).unwrap();

        let by_name = register(&db, new_user("alice", "other@example.com"));
        assert!(matches!(by_name, Err(CoreError::Conflict(_))));

        let by_email = register(&db, new_user("alicia", "alice@example.com"));
        assert!(matches!(by_email, Err(CoreError::Conflict(_))));
    }
}
