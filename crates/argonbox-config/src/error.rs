use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A config file is not valid TOML or does not match the schema.
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// File path (or a `<...>` label for non-file sources).
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A field holds an unacceptable value.
    #[error("invalid value for {field}: {message}")]
    ValidationError {
        /// Dotted field path, e.g. `defaults.memory_kib`.
        field: String,
        /// Human-readable explanation.
        message: String,
    },

    /// The user's home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDir,

    /// The resolved configuration could not be rendered.
    #[error("failed to serialize config: {0}")]
    SerializeError(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
