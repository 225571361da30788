#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the argonbox engine host.
//!
//! # Usage
//!
//! ```rust,no_run
//! use argonbox_config::Config;
//!
//! // Load with full precedence chain (defaults → system → user → env).
//! let resolved = Config::load().unwrap();
//! let config = resolved.config;
//! println!("hashing with t={}", config.defaults.time_cost);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **User** (`~/.argonbox/config.toml`, or `$ARGONBOX_HOME/config.toml`)
//! 2. **System** (`/etc/argonbox/config.toml`)
//! 3. **Environment variables** (`ARGONBOX_*`), fallback only
//! 4. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal argonbox crates**.
//! Conversion from config types to domain types happens in the consuming
//! crates (`argonbox-engine`, `argonbox-worker`, `argonbox-telemetry`).

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with precedence.
pub mod merge;
/// Resolved configuration display and serialization.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load() -> ConfigResult<ResolvedConfig> {
        loader::load(None)
    }

    /// Load configuration with an explicit argonbox home directory.
    ///
    /// The user layer is read from `{home}/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(home_dir: &std::path::Path) -> ConfigResult<ResolvedConfig> {
        loader::load(Some(home_dir))
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Parse configuration from a TOML string (no layering).
    ///
    /// Sections and fields not present in `content` take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the string does not parse or fails
    /// validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::load_str(content)
    }
}
