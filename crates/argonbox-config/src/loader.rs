//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `/etc/argonbox/config.toml` (system)
//! 3. Merge `~/.argonbox/config.toml` (user), or `$ARGONBOX_HOME/config.toml`
//! 4. Apply env var fallbacks for unset fields
//! 5. Deserialize merged tree → `Config`
//! 6. Validate
//! 7. Return `ResolvedConfig`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{ARGONBOX_HOME, apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_all_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// System-wide config location.
const SYSTEM_CONFIG: &str = "/etc/argonbox/config.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the configuration with layered file precedence.
///
/// `home_override` is used as the argonbox home directory itself (the user
/// layer is `{home_override}/config.toml`), bypassing `~/.argonbox` and
/// `ARGONBOX_HOME`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();
    let user_path = match home_override {
        Some(h) => Some(h.join("config.toml")),
        None => discover_user_config(&env_vars)?,
    };
    load_layers(Path::new(SYSTEM_CONFIG), user_path.as_deref(), &env_vars)
}

/// Merge the layers from explicit locations.
pub(crate) fn load_layers(
    system_path: &Path,
    user_path: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_all_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    // 2. System config.
    if let Some(overlay) = try_load_file(system_path)? {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::System,
            &mut field_sources,
        );
        loaded_files.push(system_path.display().to_string());
        info!(path = %system_path.display(), "loaded system config");
    }

    // 3. User config.
    if let Some(path) = user_path
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    // 4. Env var fallbacks for unset fields.
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 5. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 6. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(oversized(path, metadata.len()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Parse and validate a config from a string (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string cannot be parsed or validated.
pub fn load_str(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<string>".to_owned(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Reads once and checks the size afterwards, so there is no window between
/// a metadata check and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(oversized(path, size));
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn oversized(path: &Path, size: u64) -> ConfigError {
    ConfigError::ValidationError {
        field: path.display().to_string(),
        message: format!(
            "config file is {size} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
        ),
    }
}

/// Standard discovery: `~/.argonbox/config.toml` if it exists, else
/// `$ARGONBOX_HOME/config.toml`.
fn discover_user_config(env_vars: &HashMap<String, String>) -> ConfigResult<Option<PathBuf>> {
    let home_dir = home_directory()?;
    let user_path = home_dir.join(".argonbox").join("config.toml");
    if user_path.is_file() {
        return Ok(Some(user_path));
    }

    let Some(raw) = env_vars.get(ARGONBOX_HOME) else {
        return Ok(Some(user_path));
    };
    if let Some(canonical) = validate_argonbox_home(raw, &home_dir) {
        Ok(Some(canonical.join("config.toml")))
    } else {
        warn!(
            path = raw,
            "ARGONBOX_HOME is not a valid directory owned by current user; ignoring"
        );
        Ok(None)
    }
}

/// Validate that an `ARGONBOX_HOME` path is a real directory owned by the
/// same user who owns `home_dir`. Returns the canonicalized path on success.
fn validate_argonbox_home(raw_path: &str, home_dir: &Path) -> Option<PathBuf> {
    let canonical = PathBuf::from(raw_path).canonicalize().ok()?;

    if !canonical.is_dir() {
        return None;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let dir_uid = canonical.metadata().ok()?.uid();
        let home_uid = home_dir.metadata().ok()?.uid();
        if dir_uid != home_uid {
            return None;
        }
    }

    #[cfg(not(unix))]
    let _ = home_dir;

    Some(canonical)
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_parse() {
        let val: toml::Value = toml::from_str(DEFAULTS_TOML).unwrap();
        let table = val.as_table().unwrap();
        for section in ["engine", "defaults", "worker", "logging"] {
            assert!(table.contains_key(section), "missing [{section}]");
        }
    }

    #[test]
    fn test_defaults_match_default_impl() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
        assert!(validate::validate(&config).is_ok());
    }

    #[test]
    fn test_layers_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_layers(
            &dir.path().join("system.toml"),
            Some(&dir.path().join("user.toml")),
            &no_env(),
        )
        .unwrap();

        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.field_sources.get("defaults.time_cost"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_user_overrides_system() {
        let dir = tempfile::tempdir().unwrap();
        let system = dir.path().join("system.toml");
        let user = dir.path().join("user.toml");
        std::fs::write(&system, "[defaults]\ntime_cost = 4\nlength = 64\n").unwrap();
        std::fs::write(&user, "[defaults]\ntime_cost = 2\n").unwrap();

        let resolved = load_layers(&system, Some(&user), &no_env()).unwrap();

        assert_eq!(resolved.config.defaults.time_cost, 2);
        assert_eq!(resolved.config.defaults.length, 64);
        assert_eq!(
            resolved.field_sources.get("defaults.time_cost"),
            Some(&ConfigLayer::User)
        );
        assert_eq!(
            resolved.field_sources.get("defaults.length"),
            Some(&ConfigLayer::System)
        );
        assert_eq!(resolved.loaded_files.len(), 2);
    }

    #[test]
    fn test_env_fallback_only_for_unset_fields() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        std::fs::write(&user, "[engine]\npath = \"/from/file.wasm\"\n").unwrap();
        let env: HashMap<String, String> = [
            ("ARGONBOX_ENGINE_PATH", "/from/env.wasm"),
            ("ARGONBOX_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let resolved = load_layers(&dir.path().join("none.toml"), Some(&user), &env).unwrap();

        assert_eq!(resolved.config.engine.path.as_deref(), Some("/from/file.wasm"));
        assert_eq!(resolved.config.logging.level, "debug");
        assert_eq!(
            resolved.field_sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_invalid_layer_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        std::fs::write(&user, "[defaults]\nmemory_kib = 1000\n").unwrap();

        let result = load_layers(&dir.path().join("none.toml"), Some(&user), &no_env());
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "defaults.memory_kib"
        ));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        std::fs::write(&user, "[defaults\ntime_cost = ").unwrap();

        let result = load_layers(&dir.path().join("none.toml"), Some(&user), &no_env());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_with_home_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[worker]\npool_size = 3\n").unwrap();

        let resolved = load(Some(dir.path())).unwrap();
        assert_eq!(resolved.config.worker.pool_size, 3);
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_load_str() {
        let config = load_str("[worker]\npool_size = 4\n").unwrap();
        assert_eq!(config.worker.pool_size, 4);
        assert!(load_str("[worker]\npool_size = 0\n").is_err());
    }

    #[test]
    fn test_try_load_file_missing() {
        let result = try_load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }
}
