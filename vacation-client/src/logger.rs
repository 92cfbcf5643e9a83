//! Logging Infrastructure
//!
//! Structured logging with a console layer (pretty or JSON) and an optional
//! daily-rotating file layer.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// File name prefix of rolling log files (`vacation-client.YYYY-MM-DD`)
pub const LOG_FILE_PREFIX: &str = "vacation-client";

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Log level used when `RUST_LOG` is not set (e.g. "info", "debug")
/// * `json_format` - JSON console output (production) instead of pretty output
/// * `log_dir` - Optional directory for daily-rotating log files
///
/// Returns an error instead of panicking when a global subscriber is already set.
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers = Vec::new();

    if json_format {
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    }

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        fs::create_dir_all(log_dir)?;

        let file_log = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file_log))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    Ok(())
}

/// Initialize console-only logging
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Delete rolling log files older than `keep_days`
///
/// Returns the number of files removed.
pub fn cleanup_old_logs(log_dir: &Path, keep_days: i64) -> anyhow::Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now().date_naive() - chrono::Duration::days(keep_days);
    let prefix = format!("{}.", LOG_FILE_PREFIX);
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if let Some(date_part) = name.strip_prefix(&prefix)
            && let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_removes_only_expired_log_files() {
        let dir = TempDir::new().unwrap();
        let today = Utc::now().date_naive();
        let old = today - chrono::Duration::days(30);

        let old_file = dir.path().join(format!("{}.{}", LOG_FILE_PREFIX, old.format("%Y-%m-%d")));
        let fresh_file = dir.path().join(format!("{}.{}", LOG_FILE_PREFIX, today.format("%Y-%m-%d")));
        let unrelated = dir.path().join("notes.txt");
        for path in [&old_file, &fresh_file, &unrelated] {
            fs::write(path, "x").unwrap();
        }

        let removed = cleanup_old_logs(dir.path(), 14).unwrap();

        assert_eq!(removed, 1);
        assert!(!old_file.exists());
        assert!(fresh_file.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(cleanup_old_logs(&missing, 14).unwrap(), 0);
    }

    #[test]
    fn test_second_init_returns_error() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let first = init_logger_with_file("debug", false, log_dir.to_str());
        let second = init_logger("info", true);

        // Another test may have installed a subscriber first; either way the
        // second call must fail gracefully.
        assert!(second.is_err());
        if first.is_ok() {
            assert!(log_dir.exists());
        }
    }
}
