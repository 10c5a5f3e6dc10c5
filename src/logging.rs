//! Tracing subscriber setup.
//!
//! While the terminal UI is running it owns stdout, so log events go to a
//! daily-rolling file instead. Headless and export runs log to stderr.
//! `RUST_LOG` overrides the configured level in both cases.

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::settings::LogSettings;

/// Where log output should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Daily-rolling file under [`LogSettings::directory`].
    File,
    Stderr,
}

/// Build the level filter: `RUST_LOG` if set, otherwise `level`.
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", level, e))
}

/// Install the global subscriber.
///
/// The returned guard flushes buffered file output when dropped; keep it
/// alive until the program exits.
pub fn init(settings: &LogSettings, target: LogTarget) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(&settings.level)?;

    let guard = match target {
        LogTarget::File => {
            let appender = rolling::daily(&settings.directory, &settings.file);
            let (writer, guard) = non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Some(guard)
        }
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init()?;
            None
        }
    };

    info!("Logging initialized with level: {}", settings.level);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        assert!(env_filter("debug").is_ok());
        assert!(env_filter("sensorwatch=trace,lapin=warn").is_ok());
    }
}
