//! Console and log file output for the replisync binary
//!
//! Every line has the form `YYYY-mm-dd HH:MM:SS LEVEL message` and goes both
//! to the console and, without ANSI colors, to the log file.

use anyhow::{Context, Result};
use replisync_config::LoggingConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer as _};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keeps the file writer alive; log lines still buffered are flushed on drop
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Level filter for the configured level and verbosity flags
///
/// `RUST_LOG`, when set, takes precedence over both.
pub fn env_filter(configured: &str, verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { configured };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Split a log file path into the directory and file name the appender needs
pub fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Log file '{}' has no file name", path.display()))?
        .to_string();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((directory, file_name))
}

/// Install the global subscriber writing to `log_file` and the console
pub fn init(config: &LoggingConfig, log_file: &Path, verbose: bool, quiet: bool) -> Result<LogGuard> {
    let (directory, file_name) = split_log_path(log_file)?;
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("Failed to create log directory '{}'", directory.display()))?;

    let file_appender = tracing_appender::rolling::never(&directory, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()));

    let console_level = if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::TRACE
    };
    let console_layer = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.colored_output)
            .with_target(false)
            .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
            .with_filter(console_level)
    });

    tracing_subscriber::registry()
        .with(env_filter(&config.level, verbose))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(LogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("sync.log", ".", "sync.log")]
    #[case("logs/sync.log", "logs", "sync.log")]
    #[case("/var/log/replisync.log", "/var/log", "replisync.log")]
    fn test_split_log_path(#[case] input: &str, #[case] directory: &str, #[case] file: &str) {
        let (dir, name) = split_log_path(Path::new(input)).unwrap();
        assert_eq!(dir, PathBuf::from(directory));
        assert_eq!(name, file);
    }

    #[test]
    fn test_split_log_path_rejects_directory_like_path() {
        assert!(split_log_path(Path::new("/")).is_err());
    }
}
