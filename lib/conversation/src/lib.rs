//! Conversation service for the concierge dispatch platform.
//!
//! This crate provides:
//!
//! - **Session Store**: Bounded per-session turn history with per-session locking
//! - **Tool Registry**: Ordered catalog of function-calling tool specifications
//! - **Catalog**: The hotel concierge tool declarations

pub mod catalog;
pub mod error;
pub mod message;
pub mod session;
pub mod tool;

pub use catalog::hotel_concierge_tools;
pub use error::{DuplicateToolError, SessionError};
pub use message::{ConversationTurn, TurnRole};
pub use session::{SessionConfig, SessionGuard, SessionState, SessionStore, SweepReport};
pub use tool::{ParamSpec, ParamType, ToolRegistry, ToolSpec};
