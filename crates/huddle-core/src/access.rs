//! Access resolver: a user's effective role on one event.
//!
//! Ownership is checked first and wins over any shared-access row.
//! Roles are re-read from storage on every call; nothing is cached, so a
//! revoked grant stops working on the very next request.

use rusqlite::Connection;
use uuid::Uuid;

use huddle_db::queries;
use huddle_types::models::SharedRole;

use crate::convert::{parse_shared_role, parse_uuid};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    Editor,
    Viewer,
    NoAccess,
}

impl Access {
    pub fn can_read(self) -> bool {
        !matches!(self, Self::NoAccess)
    }

    pub fn can_edit(self) -> bool {
        matches!(self, Self::Owner | Self::Editor)
    }

    pub fn is_owner(self) -> bool {
        matches!(self, Self::Owner)
    }
}

impl From<SharedRole> for Access {
    fn from(role: SharedRole) -> Self {
        match role {
            SharedRole::Editor => Self::Editor,
            SharedRole::Viewer => Self::Viewer,
        }
    }
}

/// Role from the event's owner (`None` when the event does not exist) and
/// the user's shared-access row, if any.
pub fn resolve_role(user_id: Uuid, owner_id: Option<Uuid>, shared: Option<SharedRole>) -> Access {
    match owner_id {
        None => Access::NoAccess,
        Some(owner) if owner == user_id => Access::Owner,
        Some(_) => shared.map(Access::from).unwrap_or(Access::NoAccess),
    }
}

pub fn resolve(conn: &Connection, user_id: Uuid, event_id: Uuid) -> Result<Access> {
    let event_key = event_id.to_string();

    let Some(owner) = queries::event_owner(conn, &event_key)? else {
        return Ok(Access::NoAccess);
    };
    let owner = parse_uuid(&owner)?;
    if owner == user_id {
        return Ok(Access::Owner);
    }

    let shared = queries::shared_role(conn, &user_id.to_string(), &event_key)?
        .map(|role| parse_shared_role(&role))
        .transpose()?;

    Ok(resolve_role(user_id, Some(owner), shared))
}

// Guards. A caller with no access gets the same answer as for a missing
// event, so event ids never leak to outsiders.

fn not_found(event_id: Uuid) -> CoreError {
    CoreError::NotFound(format!("event {event_id}"))
}

pub fn require_read(conn: &Connection, user_id: Uuid, event_id: Uuid) -> Result<Access> {
    let access = resolve(conn, user_id, event_id)?;
    if !access.can_read() {
        return Err(not_found(event_id));
    }
    Ok(access)
}

pub fn require_edit(conn: &Connection, user_id: Uuid, event_id: Uuid) -> Result<Access> {
    let access = require_read(conn, user_id, event_id)?;
    if !access.can_edit() {
        return Err(CoreError::Forbidden("editor or owner role required".into()));
    }
    Ok(access)
}

pub fn require_owner(conn: &Connection, user_id: Uuid, event_id: Uuid) -> Result<()> {
    let access = require_read(conn, user_id, event_id)?;
    if !access.is_owner() {
        return Err(CoreError::Forbidden("only the owner can do this".into()));
    }
    Ok(())
}

/// Sharing endpoints answer Forbidden for a missing event, no access, and
/// any non-owner role alike.
pub fn require_sharing_owner(conn: &Connection, user_id: Uuid, event_id: Uuid) -> Result<()> {
    if !resolve(conn, user_id, event_id)?.is_owner() {
        return Err(CoreError::Forbidden("only the owner can manage sharing".into()));
    }
    Ok(())
}
