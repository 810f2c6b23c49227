//! Dispatch engine for the hotel concierge.
//!
//! This crate turns one guest question into one answer:
//!
//! - **Engine**: locks the session, grounds the prompt, calls the completion
//!   backend and interprets its reply against the tool registry
//! - **Result**: a text answer or a function invocation
//! - **Envelope**: the client-facing success and error shapes

pub mod engine;
pub mod envelope;
pub mod error;
pub mod result;

pub use engine::{DispatchConfig, DispatchEngine, DispatchState};
pub use envelope::{ErrorEnvelope, ResponseEnvelope, ResponseFormatter, SUCCESS_MESSAGE};
pub use error::{Collaborator, DispatchError};
pub use result::{DispatchResult, FunctionInvocation};
