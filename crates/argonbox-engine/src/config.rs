//! Bridge from `argonbox-config` sections to engine types.

use std::path::Path;

use argonbox_config::{Config, DefaultsSection, EngineSection};
use argonbox_core::{ArgonError, ArgonResult, EngineVersion, HashOptions};

use crate::loader::EngineLoader;
use crate::orchestrator::HashOrchestrator;

const BYTES_PER_MB: u64 = 1024 * 1024;

impl EngineLoader {
    /// Loader configured from the `[engine]` section.
    ///
    /// # Errors
    ///
    /// [`ArgonError::ImageLoad`] for an unknown profile or verify strategy.
    pub fn from_config(section: &EngineSection) -> ArgonResult<Self> {
        let mut loader = Self::new()
            .with_memory_limit(section.max_memory_mb.saturating_mul(BYTES_PER_MB))
            .with_require_hash(section.require_hash)
            .with_profile(section.profile.parse()?)
            .with_verify_strategy(section.verify.parse()?);
        if let Some(hex) = &section.blake3 {
            loader = loader.with_expected_hash(hex.clone());
        }
        Ok(loader)
    }
}

/// Hash options carrying every value of the `[defaults]` section.
///
/// # Errors
///
/// [`ArgonError::InvalidParameter`] for an unknown variant or version.
pub fn defaults_from_config(section: &DefaultsSection) -> ArgonResult<HashOptions> {
    Ok(HashOptions::new()
        .with_time_cost(section.time_cost)
        .with_memory_kib(section.memory_kib)
        .with_parallelism(section.parallelism)
        .with_variant(section.variant.parse()?)
        .with_version(EngineVersion::try_from(section.version)?)
        .with_length(section.length))
}

impl HashOrchestrator {
    /// Load the configured engine image and apply the configured defaults.
    ///
    /// # Errors
    ///
    /// [`ArgonError::ImageLoad`] if `engine.path` is unset or the image fails
    /// to load, [`ArgonError::InvalidParameter`] for bad defaults.
    pub fn from_config(config: &Config) -> ArgonResult<Self> {
        let path = config
            .engine
            .path
            .as_deref()
            .ok_or_else(|| ArgonError::ImageLoad("engine.path is not configured".into()))?;
        let image = EngineLoader::from_config(&config.engine)?.load_file(Path::new(path))?;
        Ok(Self::new(image).with_defaults(defaults_from_config(&config.defaults)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argonbox_core::Variant;

    #[test]
    fn defaults_section_maps_to_options() {
        let section = DefaultsSection {
            time_cost: 2,
            memory_kib: 8192,
            parallelism: 1,
            variant: "argon2i".into(),
            version: 16,
            length: 64,
        };
        let options = defaults_from_config(&section).unwrap();
        assert_eq!(options.time_cost, Some(2));
        assert_eq!(options.memory_kib, Some(8192));
        assert_eq!(options.variant, Some(Variant::Argon2i));
        assert_eq!(options.version, Some(EngineVersion::V0x10));
        assert_eq!(options.length, Some(64));
        assert!(options.secret.is_none());
    }

    #[test]
    fn bad_version_is_rejected() {
        let section = DefaultsSection {
            version: 18,
            ..DefaultsSection::default()
        };
        assert_eq!(
            defaults_from_config(&section).unwrap_err(),
            ArgonError::InvalidParameter("version")
        );
    }

    #[test]
    fn engine_section_maps_to_loader() {
        let section = EngineSection {
            max_memory_mb: 0,
            profile: "version-aware".into(),
            verify: "host".into(),
            ..EngineSection::default()
        };
        let loader = EngineLoader::from_config(&section).unwrap();
        let rendered = format!("{loader:?}");
        assert!(rendered.contains("max_memory_bytes: None"));
        assert!(rendered.contains("Forced(VersionAware)"));
        assert!(rendered.contains("verify: Host"));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let section = EngineSection {
            profile: "legacy".into(),
            ..EngineSection::default()
        };
        assert!(matches!(
            EngineLoader::from_config(&section),
            Err(ArgonError::ImageLoad(_))
        ));
    }

    #[test]
    fn missing_path_is_rejected() {
        assert!(matches!(
            HashOrchestrator::from_config(&Config::default()),
            Err(ArgonError::ImageLoad(_))
        ));
    }
}
