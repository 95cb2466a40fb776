//! Shared utilities for convoy
//!
//! Logging setup and environment-driven settings used by the `convoy` binary
//! and anything else embedding the workflow manager.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
