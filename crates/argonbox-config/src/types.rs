//! Configuration types for the argonbox engine host.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header in TOML produces a working
//! configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compute-engine image location, integrity and binding selection.
    pub engine: EngineSection,
    /// Default hashing parameters applied when a caller omits them.
    pub defaults: DefaultsSection,
    /// Async worker settings.
    pub worker: WorkerSection,
    /// Logging and tracing configuration.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// EngineSection
// ---------------------------------------------------------------------------

/// Compute-engine image settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Path to the engine `.wasm` image.
    pub path: Option<String>,
    /// Expected BLAKE3 digest of the image (64 hex characters).
    pub blake3: Option<String>,
    /// Refuse to load an image when no digest is configured.
    pub require_hash: bool,
    /// Binding profile: `"auto"`, `"explicit-scratch"` or `"version-aware"`.
    pub profile: String,
    /// Verify strategy: `"auto"`, `"engine"` or `"host"`.
    pub verify: String,
    /// Per-instance linear memory cap in MiB. `0` means no cap beyond the
    /// engine's own maximum.
    pub max_memory_mb: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            path: None,
            blake3: None,
            require_hash: false,
            profile: "auto".to_owned(),
            verify: "auto".to_owned(),
            max_memory_mb: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// DefaultsSection
// ---------------------------------------------------------------------------

/// Default hashing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    /// Time cost `t`.
    pub time_cost: u32,
    /// Memory cost `m` in KiB.
    pub memory_kib: u32,
    /// Parallelism `p`.
    pub parallelism: u32,
    /// `"argon2d"`, `"argon2i"` or `"argon2id"`.
    pub variant: String,
    /// Engine version: `16` (`0x10`) or `19` (`0x13`).
    pub version: u32,
    /// Output length in bytes.
    pub length: u32,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            time_cost: 3,
            memory_kib: 65536,
            parallelism: 1,
            variant: "argon2id".to_owned(),
            version: 0x13,
            length: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerSection
// ---------------------------------------------------------------------------

/// Async worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    /// Number of independent workers in a pool.
    pub pool_size: usize,
    /// OS thread name prefix for worker threads.
    pub thread_name: String,
    /// Worker thread stack size in KiB. `0` uses the platform default.
    pub stack_size_kb: u64,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            pool_size: 1,
            thread_name: "argonbox-worker".to_owned(),
            stack_size_kb: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Output stream: `"stderr"` or `"stdout"`.
    pub target: String,
    /// Per-crate tracing directives (e.g. `["argonbox_engine=debug",
    /// "wasmtime=warn"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_sections_use_defaults() {
        let config: Config = toml::from_str("[engine]\n[worker]\n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [defaults]
            time_cost = 2
            variant = "argon2i"
        "#,
        )
        .unwrap();
        assert_eq!(config.defaults.time_cost, 2);
        assert_eq!(config.defaults.variant, "argon2i");
        assert_eq!(config.defaults.memory_kib, 65536);
        assert_eq!(config.defaults.version, 0x13);
    }
}
