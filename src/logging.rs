//! Structured logging setup.
//!
//! - JSON formatting for CI and production runs
//! - Pretty formatting for local development
//! - stdout, stderr, or daily-rotated file output
//! - Pipeline spans (operation, language, rule)

use anyhow::{Context, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Configuration for logging setup.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log format: "json" or "pretty"
    pub format: LogFormat,
    /// Log output: "stdout", "stderr", or "file"
    pub output: LogOutput,
    /// Directory for log files (when output is "file")
    pub log_dir: PathBuf,
    /// Log file name prefix
    pub log_file_prefix: String,
    pub service_name: String,
    pub service_version: String,
    /// Environment (e.g., "dev", "ci", "production")
    pub environment: String,
    /// Rotate log files daily
    pub enable_rotation: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let is_machine_read = matches!(environment.as_str(), "production" | "prod" | "ci");

        Self {
            format: if is_machine_read {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            log_file_prefix: "proto-rulegen".to_string(),
            service_name: "proto-rulegen".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
            enable_rotation: true,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(format) = env::var("LOG_FORMAT") {
            config.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => config.format,
            };
        }

        if let Ok(output) = env::var("LOG_OUTPUT") {
            config.output = match output.to_lowercase().as_str() {
                "stdout" => LogOutput::Stdout,
                "stderr" => LogOutput::Stderr,
                "file" => LogOutput::File,
                _ => config.output,
            };
        }

        if let Ok(log_dir) = env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir);
        }

        if let Ok(rotation) = env::var("LOG_ROTATION") {
            config.enable_rotation = !matches!(rotation.to_lowercase().as_str(), "never" | "off");
        }

        config
    }

    /// Move stdout logging to stderr; stdout then carries only the drift
    /// report.
    pub fn with_stdout_reserved(mut self) -> Self {
        if self.output == LogOutput::Stdout {
            self.output = LogOutput::Stderr;
        }
        self
    }

    fn default_directive(&self) -> &'static str {
        match self.environment.as_str() {
            "production" | "prod" | "ci" => "info",
            _ => "debug",
        }
    }
}

/// Initialize structured logging with the given configuration.
///
/// Returns a WorkerGuard that must be held for the lifetime of the process
/// to ensure all logs are flushed.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let (writer, guard) = match config.output {
        LogOutput::Stdout => {
            let (non_blocking, guard) = tracing_appender::non_blocking(io::stdout());
            (non_blocking, Some(guard))
        }
        LogOutput::Stderr => {
            let (non_blocking, guard) = tracing_appender::non_blocking(io::stderr());
            (non_blocking, Some(guard))
        }
        LogOutput::File => {
            std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

            let file_appender = if config.enable_rotation {
                tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix)
            } else {
                tracing_appender::rolling::never(&config.log_dir, &config.log_file_prefix)
            };

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (non_blocking, Some(guard))
        }
    };

    let registry = tracing_subscriber::registry();

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter);
            registry
                .with(fmt_layer)
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_target(false)
                .with_level(true)
                .with_line_number(false)
                .with_file(false)
                .with_ansi(matches!(config.output, LogOutput::Stdout | LogOutput::Stderr))
                .with_filter(env_filter);
            registry
                .with(fmt_layer)
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
    }

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        format = ?config.format,
        output = ?config.output,
        "logging initialized"
    );

    Ok(guard)
}

/// Log a slow operation warning.
///
/// Logs at WARN when the operation took longer than the threshold, DEBUG otherwise.
#[macro_export]
macro_rules! log_slow_operation {
    ($duration:expr, $threshold_ms:expr, $($arg:tt)*) => {
        {
            let duration_ms = $duration.as_millis() as u64;
            if duration_ms > $threshold_ms {
                tracing::warn!(
                    duration_ms = duration_ms,
                    threshold_ms = $threshold_ms,
                    $($arg)*
                );
            } else {
                tracing::debug!(
                    duration_ms = duration_ms,
                    $($arg)*
                );
            }
        }
    };
}

/// Span for one pipeline stage.
pub fn operation_span(name: &'static str) -> tracing::Span {
    tracing::info_span!(
        "operation",
        operation.name = name,
        service = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION")
    )
}

/// Span for work on one language.
pub fn language_span(language: &str) -> tracing::Span {
    tracing::debug_span!("language", rulegen.language = language)
}

/// Span for work on one rule.
pub fn rule_span(rule: &str) -> tracing::Span {
    tracing::debug_span!("rule", rulegen.rule = rule)
}
