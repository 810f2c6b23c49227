//! Hotel concierge HTTP service.
//!
//! Exposes the dispatch engine over a JSON API. Each request resolves
//! collaborator keys, runs one dispatch against the guest's session, and
//! renders the result as a response envelope.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
