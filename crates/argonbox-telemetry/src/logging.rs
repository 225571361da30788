//! Subscriber construction.

use std::str::FromStr;

use argonbox_config::{Config, LoggingSection};
use tracing::Subscriber;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

/// Event layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
    /// `tracing-subscriber`'s default layout.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> TelemetryResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::Invalid {
                field: "format",
                message: format!("unknown format '{other}'"),
            }),
        }
    }
}

/// Output stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
}

impl FromStr for LogTarget {
    type Err = TelemetryError;

    fn from_str(s: &str) -> TelemetryResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            other => Err(TelemetryError::Invalid {
                field: "target",
                message: format!("unknown target '{other}'"),
            }),
        }
    }
}

/// What to log and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Global level (`"info"`, `"debug"`, ...).
    pub level: String,
    /// Event layout.
    pub format: LogFormat,
    /// Output stream.
    pub target: LogTarget,
    /// Per-target overrides such as `argonbox_engine=debug`.
    pub directives: Vec<String>,
    /// Print the emitting thread's name on each event.
    pub thread_names: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogConfig {
    /// Compact output to stderr at `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            directives: Vec::new(),
            thread_names: true,
        }
    }

    /// Use `format`.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Write to `target`.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a per-target override.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Leave thread names out of each event.
    #[must_use]
    pub fn without_thread_names(mut self) -> Self {
        self.thread_names = false;
        self
    }

    /// The level followed by the overrides, as one filter.
    fn filter(&self) -> TelemetryResult<EnvFilter> {
        let spec = std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::try_new(&spec).map_err(|e| TelemetryError::Invalid {
            field: "filter",
            message: format!("'{spec}': {e}"),
        })
    }
}

impl TryFrom<&LoggingSection> for LogConfig {
    type Error = TelemetryError;

    fn try_from(section: &LoggingSection) -> TelemetryResult<Self> {
        Ok(Self {
            level: section.level.to_ascii_lowercase(),
            format: section.format.parse()?,
            target: section.target.parse()?,
            directives: section.directives.clone(),
            thread_names: true,
        })
    }
}

type Filtered = Layered<EnvFilter, Registry>;

/// A subscriber for `config` that writes to `writer`.
///
/// [`setup_logging`] installs one of these over stdout or stderr; tests and
/// embedders can pass any other writer.
///
/// # Errors
///
/// [`TelemetryError::Invalid`] if the level or a directive does not parse.
pub fn subscriber<W>(
    config: &LogConfig,
    writer: W,
) -> TelemetryResult<impl Subscriber + Send + Sync + 'static>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = config.filter()?;
    let events = fmt::layer()
        .with_writer(writer)
        .with_thread_names(config.thread_names)
        .with_ansi(!matches!(config.format, LogFormat::Json));

    let events: Box<dyn Layer<Filtered> + Send + Sync> = match config.format {
        LogFormat::Pretty => events.pretty().boxed(),
        LogFormat::Compact => events.compact().boxed(),
        LogFormat::Json => events.json().boxed(),
        LogFormat::Full => events.boxed(),
    };
    Ok(tracing_subscriber::registry().with(filter).with(events))
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// [`TelemetryError::Invalid`] for a bad filter, [`TelemetryError::Install`]
/// if a global subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let installed = match config.target {
        LogTarget::Stdout => subscriber(config, std::io::stdout)?.try_init(),
        LogTarget::Stderr => subscriber(config, std::io::stderr)?.try_init(),
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))
}

/// Install the global subscriber described by the `[logging]` section.
///
/// # Errors
///
/// As [`setup_logging`], plus [`TelemetryError::Invalid`] for an unknown
/// format or target.
pub fn init_from_config(config: &Config) -> TelemetryResult<()> {
    setup_logging(&LogConfig::try_from(&config.logging)?)
}
