//! Environment variable fallbacks.
//!
//! Environment variables fill fields that no config file set: a field still
//! at its embedded default (or absent from every layer) takes the variable's
//! value, a field set by the system or user file is left alone.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::merge::{ConfigLayer, FieldSources};

/// Prefix shared by every variable this crate reads.
pub const ENV_PREFIX: &str = "ARGONBOX_";

/// Alternate location of the user configuration directory.
pub const ARGONBOX_HOME: &str = "ARGONBOX_HOME";

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    String,
    Integer,
}

struct EnvFallback {
    var: &'static str,
    section: &'static str,
    key: &'static str,
    kind: EnvKind,
}

const FALLBACKS: &[EnvFallback] = &[
    EnvFallback {
        var: "ARGONBOX_ENGINE_PATH",
        section: "engine",
        key: "path",
        kind: EnvKind::String,
    },
    EnvFallback {
        var: "ARGONBOX_ENGINE_BLAKE3",
        section: "engine",
        key: "blake3",
        kind: EnvKind::String,
    },
    EnvFallback {
        var: "ARGONBOX_LOG_LEVEL",
        section: "logging",
        key: "level",
        kind: EnvKind::String,
    },
    EnvFallback {
        var: "ARGONBOX_WORKER_POOL_SIZE",
        section: "worker",
        key: "pool_size",
        kind: EnvKind::Integer,
    },
];

/// Snapshot every `ARGONBOX_*` variable from the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}

/// Apply environment fallbacks to the merged tree.
///
/// Returns the number of fields set from the environment. Values that do
/// not parse for their field are skipped with a warning; validation later
/// reports the field if the remaining value is unacceptable.
pub fn apply_env_fallbacks(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String>,
) -> usize {
    let mut applied: usize = 0;

    for fallback in FALLBACKS {
        let Some(raw) = env_vars.get(fallback.var) else {
            continue;
        };
        let path = format!("{}.{}", fallback.section, fallback.key);
        let overridable = sources
            .get(&path)
            .is_none_or(|layer| *layer == ConfigLayer::Defaults);
        if !overridable {
            debug!(var = fallback.var, field = %path, "field set by config file, ignoring env");
            continue;
        }

        let value = match fallback.kind {
            EnvKind::String => toml::Value::String(raw.clone()),
            EnvKind::Integer => match raw.trim().parse::<i64>() {
                Ok(n) => toml::Value::Integer(n),
                Err(_) => {
                    warn!(var = fallback.var, value = %raw, "expected an integer, ignoring");
                    continue;
                },
            },
        };

        let Some(root) = merged.as_table_mut() else {
            return applied;
        };
        let section = root
            .entry(fallback.section)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        if let Some(table) = section.as_table_mut() {
            table.insert(fallback.key.to_owned(), value);
            sources.insert(path, ConfigLayer::Environment);
            applied = applied.saturating_add(1);
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_fills_absent_field() {
        let mut merged: toml::Value = toml::from_str("[engine]\nprofile = \"auto\"\n").unwrap();
        let mut sources = FieldSources::new();
        let vars = env(&[("ARGONBOX_ENGINE_PATH", "/opt/argon2.wasm")]);

        let n = apply_env_fallbacks(&mut merged, &mut sources, &vars);

        assert_eq!(n, 1);
        assert_eq!(merged["engine"]["path"].as_str(), Some("/opt/argon2.wasm"));
        assert_eq!(sources.get("engine.path"), Some(&ConfigLayer::Environment));
    }

    #[test]
    fn test_overrides_default_but_not_file() {
        let mut merged: toml::Value =
            toml::from_str("[logging]\nlevel = \"info\"\n[worker]\npool_size = 2\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);
        sources.insert("worker.pool_size".to_owned(), ConfigLayer::User);
        let vars = env(&[
            ("ARGONBOX_LOG_LEVEL", "debug"),
            ("ARGONBOX_WORKER_POOL_SIZE", "8"),
        ]);

        let n = apply_env_fallbacks(&mut merged, &mut sources, &vars);

        assert_eq!(n, 1);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(merged["worker"]["pool_size"].as_integer(), Some(2));
    }

    #[test]
    fn test_bad_integer_skipped() {
        let mut merged: toml::Value = toml::from_str("[worker]\npool_size = 1\n").unwrap();
        let mut sources = FieldSources::new();
        let vars = env(&[("ARGONBOX_WORKER_POOL_SIZE", "lots")]);

        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &vars), 0);
        assert_eq!(merged["worker"]["pool_size"].as_integer(), Some(1));
    }

    #[test]
    fn test_creates_missing_section() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut sources = FieldSources::new();
        let vars = env(&[("ARGONBOX_ENGINE_BLAKE3", "ab")]);

        apply_env_fallbacks(&mut merged, &mut sources, &vars);
        assert_eq!(merged["engine"]["blake3"].as_str(), Some("ab"));
    }
}
