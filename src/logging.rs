//! Logging configuration for interface-injector
//!
//! The container emits `tracing` events under the [`TARGET`] target:
//! `debug` for container, scope and registration changes, `trace` for each
//! resolution step and cache hit, `warn` when a failed resolution discards
//! pending on-create callbacks. This module installs a subscriber for them.
//!
//! # Features
//!
//! - `logging` - Emit events (default)
//! - `logging-json` - JSON structured output (recommended for production)
//! - `logging-pretty` - Colorful pretty output (recommended for development)
//!
//! Without `logging-json` or `logging-pretty` the init functions do nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_injector::logging;
//!
//! // JSON if logging-json, pretty if logging-pretty
//! logging::init();
//!
//! // Or configure it
//! logging::builder()
//!     .trace()
//!     .di_only()
//!     .compact()
//!     .with_thread_names()
//!     .init();
//! ```

use std::fmt;
use std::str::FromStr;
use tracing::Level;

/// Target of every event emitted by the container
pub const TARGET: &str = "interface_injector";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[default]
    Json,
    /// Pretty colorful output (development)
    Pretty,
    /// Compact single-line output
    Compact,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Builder for logging configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    from_env: bool,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
    with_thread_names: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            from_env: false,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
            with_thread_names: false,
        }
    }
}

impl LoggingBuilder {
    /// Create a new logging builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set log level to TRACE (every resolution step)
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    /// Set log level to DEBUG (registrations, scopes, cache fills)
    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    /// Set log level to WARN (discarded on-create callbacks only)
    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    /// Filter to only show logs from a specific target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show interface-injector logs
    pub fn di_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Let `RUST_LOG` replace the configured level and target filter when set
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Include file names in log output
    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    /// Include line numbers in log output
    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    /// Include thread IDs in log output
    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    /// Include thread names in log output
    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    /// Use the given output format
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Use JSON structured logging format
    pub fn json(self) -> Self {
        self.format(LogFormat::Json)
    }

    /// Use pretty colorful logging format
    pub fn pretty(self) -> Self {
        self.format(LogFormat::Pretty)
    }

    /// Use compact single-line logging format
    pub fn compact(self) -> Self {
        self.format(LogFormat::Compact)
    }

    /// Filter directive built from the level and target filter
    pub fn directive(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        match self.target {
            Some(target) => format!("{target}={level}"),
            None => level,
        }
    }

    /// Install the configured subscriber as the global default.
    ///
    /// Fails if a global subscriber is already installed.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let directive = self.directive();
        let filter = if self.from_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive))
        } else {
            EnvFilter::new(&directive)
        };

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => fmt::layer()
                .json()
                .with_file(self.with_file)
                .with_line_number(self.with_line_number)
                .with_thread_ids(self.with_thread_ids)
                .with_thread_names(self.with_thread_names)
                .with_target(true)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_file(self.with_file)
                .with_line_number(self.with_line_number)
                .with_thread_ids(self.with_thread_ids)
                .with_thread_names(self.with_thread_names)
                .with_target(true)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_file(self.with_file)
                .with_line_number(self.with_line_number)
                .with_thread_ids(self.with_thread_ids)
                .with_thread_names(self.with_thread_names)
                .with_target(true)
                .boxed(),
            // JSON output needs logging-json; fall back to the full formatter
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => fmt::layer()
                .with_file(self.with_file)
                .with_line_number(self.with_line_number)
                .with_thread_ids(self.with_thread_ids)
                .with_thread_names(self.with_thread_names)
                .with_target(true)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
    }

    /// Install the configured subscriber, leaving an existing global
    /// subscriber in place.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Initialize (no-op when subscriber features not available)
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging with default settings
///
/// Uses JSON format if `logging-json` is enabled, otherwise pretty format
/// if `logging-pretty` is enabled.
pub fn init() {
    #[cfg(feature = "logging-json")]
    init_json();

    #[cfg(all(feature = "logging-pretty", not(feature = "logging-json")))]
    init_pretty();
}

/// Initialize JSON structured logging
///
/// # Example output
/// ```json
/// {"timestamp":"2024-01-01T00:00:00.000Z","level":"DEBUG","target":"interface_injector","fields":{"message":"Registered implementation","interface":"dyn app::Logger","implementation":"app::ConsoleLogger","lifetime":"instance-singleton"}}
/// ```
pub fn init_json() {
    builder().json().debug().init();
}

/// Initialize pretty colorful logging
///
/// # Example output
/// ```text
///   2024-01-01T00:00:00.000Z DEBUG interface_injector: Creating child scope from parent container, parent_depth: 0, child_depth: 1
/// ```
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Initialize logging for interface-injector only (filters other crates)
pub fn init_di_only() {
    builder().di_only().debug().init();
}
