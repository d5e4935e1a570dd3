//! syslens daemon library.
//!
//! Exposes the daemon's building blocks for integration testing.
//! In production, `syslens-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod filter_input;
pub mod health;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
