//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold. The hashing
//! defaults are checked with the same rules the engine host applies to
//! caller options, so a config that loads never produces defaults the host
//! would reject.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_engine(config)?;
    validate_defaults(config)?;
    validate_worker(config)?;
    validate_logging(config)?;
    Ok(())
}

/// Largest worker pool accepted.
const MAX_POOL_SIZE: usize = 256;

/// Largest per-instance memory cap: the whole 32-bit engine address space.
const MAX_MEMORY_MB: u64 = 4096;

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_engine(config: &Config) -> ConfigResult<()> {
    let e = &config.engine;

    if !matches!(
        e.profile.as_str(),
        "auto" | "explicit-scratch" | "version-aware"
    ) {
        return Err(invalid(
            "engine.profile",
            format!(
                "unknown profile '{}'; expected one of: auto, explicit-scratch, version-aware",
                e.profile
            ),
        ));
    }

    if !matches!(e.verify.as_str(), "auto" | "engine" | "host") {
        return Err(invalid(
            "engine.verify",
            format!(
                "unknown verify strategy '{}'; expected one of: auto, engine, host",
                e.verify
            ),
        ));
    }

    if let Some(path) = &e.path
        && path.trim().is_empty()
    {
        return Err(invalid("engine.path", "path must not be empty"));
    }

    if let Some(digest) = &e.blake3
        && (digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(invalid(
            "engine.blake3",
            "expected a 64-character hex BLAKE3 digest",
        ));
    }

    if e.require_hash && e.blake3.is_none() {
        return Err(invalid(
            "engine.require_hash",
            "require_hash is set but no engine.blake3 digest is configured",
        ));
    }

    if e.max_memory_mb > MAX_MEMORY_MB {
        return Err(invalid(
            "engine.max_memory_mb",
            format!("max_memory_mb must be at most {MAX_MEMORY_MB} (0 = engine maximum)"),
        ));
    }

    Ok(())
}

fn validate_defaults(config: &Config) -> ConfigResult<()> {
    let d = &config.defaults;

    if d.time_cost == 0 {
        return Err(invalid("defaults.time_cost", "time_cost must be at least 1"));
    }

    if d.parallelism == 0 {
        return Err(invalid(
            "defaults.parallelism",
            "parallelism must be at least 1",
        ));
    }

    let min_memory = u64::from(d.parallelism).saturating_mul(8 * 1024);
    if d.memory_kib % 1024 != 0 || u64::from(d.memory_kib) < min_memory {
        return Err(invalid(
            "defaults.memory_kib",
            format!(
                "memory_kib must be a multiple of 1024 and at least {min_memory} for parallelism {}",
                d.parallelism
            ),
        ));
    }

    if !matches!(
        d.variant.to_ascii_lowercase().as_str(),
        "argon2d" | "argon2i" | "argon2id"
    ) {
        return Err(invalid(
            "defaults.variant",
            format!(
                "unknown variant '{}'; expected one of: argon2d, argon2i, argon2id",
                d.variant
            ),
        ));
    }

    if !matches!(d.version, 0x10 | 0x13) {
        return Err(invalid(
            "defaults.version",
            format!("unsupported version {}; expected 16 (0x10) or 19 (0x13)", d.version),
        ));
    }

    if d.length < 4 {
        return Err(invalid("defaults.length", "length must be at least 4 bytes"));
    }

    Ok(())
}

fn validate_worker(config: &Config) -> ConfigResult<()> {
    let w = &config.worker;

    if w.pool_size == 0 || w.pool_size > MAX_POOL_SIZE {
        return Err(invalid(
            "worker.pool_size",
            format!("pool_size must be between 1 and {MAX_POOL_SIZE}"),
        ));
    }

    if w.thread_name.trim().is_empty() {
        return Err(invalid("worker.thread_name", "thread_name must not be empty"));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    if !matches!(l.target.as_str(), "stderr" | "stdout") {
        return Err(invalid(
            "logging.target",
            format!("unknown target '{}'; expected stderr or stdout", l.target),
        ));
    }

    Ok(())
}
