//! Shared utilities for the nanomock tooling.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat, LoggingError};
pub use time::format_elapsed;
