//! Core domain types and utilities for the concierge dispatch service.
//!
//! This crate provides the identifiers and the error-handling foundation
//! shared by the conversation, AI, dispatch and server crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{DispatchId, ParseIdError, SessionKey, TurnId};
