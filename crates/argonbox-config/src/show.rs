//! Resolved configuration with provenance.

use std::fmt;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};
use crate::types::Config;

/// The outcome of a layered load: the final configuration plus where each
/// field came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The merged, validated configuration.
    pub config: Config,
    /// Layer that last set each dotted field path.
    pub field_sources: FieldSources,
    /// Config files that were found and merged, in merge order.
    pub loaded_files: Vec<String>,
}

/// Output format for [`ResolvedConfig::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML, as it would appear in a config file.
    Toml,
    /// Pretty-printed JSON.
    Json,
}

impl fmt::Display for ShowFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => write!(f, "toml"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl ResolvedConfig {
    /// Layer that set `field` (dotted path), if any.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }

    /// Render the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if the configuration cannot be
    /// encoded in the requested format.
    pub fn render(&self, format: ShowFormat) -> ConfigResult<String> {
        match format {
            ShowFormat::Toml => toml::to_string_pretty(&self.config)
                .map_err(|e| ConfigError::SerializeError(e.to_string())),
            ShowFormat::Json => serde_json::to_string_pretty(&self.config)
                .map_err(|e| ConfigError::SerializeError(e.to_string())),
        }
    }
}
