//! Prelude module - commonly used types for convenient import.
//!
//! ```rust,no_run
//! use argonbox_telemetry::prelude::*;
//!
//! # fn main() -> TelemetryResult<()> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("argonbox_engine=trace");
//!
//! setup_logging(&config)?;
//! # Ok(())
//! # }
//! ```

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging configuration
pub use crate::{LogConfig, LogFormat, LogTarget};

// Setup functions
pub use crate::{init_from_config, setup_logging};
