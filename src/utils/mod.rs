//! Shared utilities: error types and logging.

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{DataPrepError, Result};
pub use logging::init_logging;
