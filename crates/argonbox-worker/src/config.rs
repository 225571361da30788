//! Worker settings and the bridge from the `[worker]` config section.

use argonbox_config::{Config, WorkerSection};
use argonbox_core::HashOptions;
use argonbox_engine::{EngineImage, EngineLoader, defaults_from_config};

use crate::error::{WorkerError, WorkerResult};

/// Default name of the isolated context's thread.
pub const DEFAULT_THREAD_NAME: &str = "argonbox-worker";

/// Settings for one [`ArgonWorker`](crate::ArgonWorker).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name of the isolated context's thread.
    pub thread_name: String,
    /// Stack size of that thread; `None` uses the platform default.
    pub stack_size: Option<usize>,
    /// Defaults for options a request leaves unset.
    pub defaults: HashOptions,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
            defaults: HashOptions::default(),
        }
    }
}

impl WorkerConfig {
    /// Use `name` for the worker thread.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Use `defaults` for options a request leaves unset.
    #[must_use]
    pub fn with_defaults(mut self, defaults: HashOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Settings from the `[worker]` section.
    #[must_use]
    pub fn from_section(section: &WorkerSection) -> Self {
        let stack_size = section
            .stack_size_kb
            .checked_mul(1024)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .filter(|&bytes| bytes > 0);
        Self {
            thread_name: section.thread_name.clone(),
            stack_size,
            defaults: HashOptions::default(),
        }
    }

    /// Settings plus engine image from a full configuration.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Hash`] if the engine image or the defaults are invalid.
    pub fn load(config: &Config) -> WorkerResult<(EngineImage, Self)> {
        let path = config
            .engine
            .path
            .as_deref()
            .ok_or_else(|| WorkerError::Config("engine.path is not configured".into()))?;
        let image = EngineLoader::from_config(&config.engine)?.load_file(path.as_ref())?;
        let worker = Self::from_section(&config.worker)
            .with_defaults(defaults_from_config(&config.defaults)?);
        Ok((image, worker))
    }
}
