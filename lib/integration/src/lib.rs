//! Tool handlers for the concierge service.
//!
//! This crate provides:
//!
//! - **ToolHandler trait**: Common interface for executing a selected tool
//! - **Handler registry**: Name-indexed routing to handlers
//! - **Open-Meteo**: Current temperature for `get_current_temperature`

pub mod error;
pub mod handler;
pub mod weather;

pub use error::HandlerError;
pub use handler::{HandlerOutput, HandlerRegistry, ToolHandler};
pub use weather::{OpenMeteoConfig, OpenMeteoTemperature, TEMPERATURE_TOOL};
