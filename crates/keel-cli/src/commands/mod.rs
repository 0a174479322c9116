//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `probe` - Backend health checks
//! - `serve` - API server command

pub mod probe;
pub mod serve;

// Re-export command functions for main.rs
pub use probe::*;
pub use serve::*;
