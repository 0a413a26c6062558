//! Shared utilities for the stock dashboard
//!
//! This crate provides the process-level pieces used by the dashboard binaries:
//! tracing setup and the application configuration read from the environment.

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::{init_tracing, init_tracing_with};
