use chrono::{TimeZone, Utc};

use huddle_db::Database;
use huddle_types::models::{EventFields, GlobalRole, User};

use crate::identity::{self, NewUser};

pub fn db() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn user(db: &Database, username: &str) -> User {
    identity::register(
        db,
        NewUser {
            username: username.into(),
            email: format!("{username}@example.com"),
            credential_hash: "hash".into(),
            role: GlobalRole::User,
        },
    )
    .unwrap()
}

pub fn fields(title: &str, description: &str, hour: u32) -> EventFields {
    EventFields {
        title: title.into(),
        description: description.into(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 6, hour, 0, 0).unwrap(),
    }
}
