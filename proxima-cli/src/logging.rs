//! Structured logging bootstrap for the CLI binary.
//!
//! All diagnostics go to stderr so command payloads on stdout stay
//! parseable. The filter is taken from `RUST_LOG` (defaulting to `info`),
//! and `PROXIMA_LOG_FORMAT` selects between human-readable and JSON events.
//! The `log` facade is bridged into `tracing` so dependencies using either
//! API end up in the same stream.

use std::{
    env, fmt,
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const FORMAT_ENV: &str = "PROXIMA_LOG_FORMAT";

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Errors raised while reading the logging configuration.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// `PROXIMA_LOG_FORMAT` named a format this binary does not produce.
    #[error("unknown log format `{value}`; use `human` or `json`")]
    UnknownFormat { value: String },
    /// The format environment variable held non-UTF-8 data.
    #[error("environment variable `{name}` is not valid UTF-8")]
    NonUnicodeEnv {
        name: &'static str,
        #[source]
        source: env::VarError,
    },
}

/// Output shape for diagnostic events.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum LogFormat {
    /// Compact single-line text for terminals.
    #[default]
    Human,
    /// One JSON object per event, with span context attached.
    Json,
}

impl LogFormat {
    fn from_env() -> Result<Self, LoggingError> {
        match env::var(FORMAT_ENV) {
            Ok(raw) => raw.parse(),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(source @ env::VarError::NotUnicode(_)) => Err(LoggingError::NonUnicodeEnv {
                name: FORMAT_ENV,
                source,
            }),
        }
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(raw: &str) -> Result<Self, LoggingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(LoggingError::UnknownFormat {
                value: raw.trim().to_owned(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Human => "human",
            Self::Json => "json",
        })
    }
}

/// Installs the global `tracing` subscriber once per process.
///
/// Later calls are no-ops. Losing the race for the global dispatcher slot to
/// some other subscriber is reported on stderr and otherwise tolerated, so
/// embedding callers keep whatever they configured first.
///
/// # Errors
/// Returns [`LoggingError`] when `PROXIMA_LOG_FORMAT` cannot be read or
/// names an unknown format.
#[expect(
    clippy::print_stderr,
    reason = "A lost dispatcher race is reported before any subscriber of ours exists"
)]
pub fn init_logging() -> Result<(), LoggingError> {
    if INSTALLED.load(Ordering::Acquire) {
        return Ok(());
    }
    let format = LogFormat::from_env()?;
    if let Err(source) = install(format) {
        eprintln!("structured logging already configured elsewhere: {source}");
    }
    INSTALLED.store(true, Ordering::Release);
    Ok(())
}

fn install(format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let events = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let events = match format {
        LogFormat::Human => events.boxed(),
        LogFormat::Json => events
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    };

    // The bridge is best-effort: a second LogTracer::init means some other
    // logger owns the `log` facade already.
    let _ = LogTracer::init();

    tracing_subscriber::registry()
        .with(filter)
        .with(events)
        .try_init()
}
