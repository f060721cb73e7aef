//! Examina Core - Shared data structures and infrastructure
//!
//! This module defines the error handling, configuration, and logging
//! foundation used by the session and authorization layers.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tokio;
pub use tracing;
