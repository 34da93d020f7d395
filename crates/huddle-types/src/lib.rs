/// Shared models and wire types for Huddle.
///
/// `models` holds the domain records returned by the core, `api` the
/// request/response bodies and JWT claims used at the HTTP edge.
pub mod api;
pub mod models;
