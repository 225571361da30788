//! Argonbox Telemetry - Logging for the argonbox engine host.
//!
//! Turns the `[logging]` section of `argonbox-config` (or a hand-built
//! [`LogConfig`]) into a `tracing` subscriber. Worker threads are named, so
//! thread names are on by default to tell worker events from sync-path ones.
//!
//! # Example
//!
//! ```rust,no_run
//! use argonbox_config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resolved = Config::load()?;
//! argonbox_telemetry::init_from_config(&resolved.config)?;
//! tracing::info!("engine host starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, init_from_config, setup_logging, subscriber};
