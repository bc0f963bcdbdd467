//! # portico-core
//!
//! Core types, settings, and error types for the portico framework.
//! Every other portico crate builds on this one.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Per-application configuration values
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - Utility types (`MultiValueDict`, text helpers)

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{PorticoError, PorticoResult};
pub use settings::{RoutingSettings, Settings, ViewSettings};
