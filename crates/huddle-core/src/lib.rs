//! Huddle domain core.
//!
//! Every operation here is one unit of work against the `Database`:
//! the caller's role on an event is resolved from current storage first,
//! and mutations append to the version log inside the same transaction
//! that applies them.

pub mod access;
mod convert;
pub mod error;
pub mod events;
pub mod history;
pub mod identity;
pub mod sharing;

#[cfg(test)]
mod testutil;

pub use access::Access;
pub use error::{CoreError, Result};
