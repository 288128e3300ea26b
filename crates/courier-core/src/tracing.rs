//! Log output for the `courier` binary.
//!
//! The server logs at INFO (DEBUG with its debug flag); one-shot client
//! commands only surface warnings. `RUST_LOG` overrides the level either way.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self as tfmt, format::FmtSpan},
    prelude::*,
};

#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format {other:?} (expected compact, pretty or json)"
            )),
        }
    }
}

/// Subscriber settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub level: Level,
    pub format: LogFormat,
    /// File/line on every event, plus span open/close so connection
    /// lifetimes show up.
    pub verbose: bool,
    /// Timestamps and targets.
    pub decorated: bool,
}

impl TracingConfig {
    /// Settings for `courier server`.
    #[must_use]
    pub fn server(debug: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::INFO },
            format: LogFormat::Compact,
            verbose: debug,
            decorated: true,
        }
    }

    /// Settings for client commands, whose output is for the terminal.
    #[must_use]
    pub fn client(debug: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::WARN },
            format: LogFormat::Compact,
            verbose: false,
            decorated: false,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Filter directive used when RUST_LOG is unset.
    pub fn directive(&self) -> String {
        format!("courier={}", self.level)
    }
}

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directive()));

    let span_events = if config.verbose {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = tfmt::layer()
        .with_file(config.verbose)
        .with_line_number(config.verbose)
        .with_target(config.decorated)
        .with_span_events(span_events);

    let layer = match (config.format, config.decorated) {
        (LogFormat::Compact, true) => base.compact().boxed(),
        (LogFormat::Compact, false) => base.compact().without_time().boxed(),
        (LogFormat::Pretty, true) => base.pretty().boxed(),
        (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
        // Log shippers want every field, timestamps included.
        (LogFormat::Json, _) => base.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}
