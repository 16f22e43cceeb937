//! Structured logging setup with tracing

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rolling log files are named `photo_culler.log.YYYY-MM-DD`
pub const LOG_FILE_PREFIX: &str = "photo_culler.log";

/// Flushes the file writer on drop
pub type LogGuard = WorkerGuard;

/// Initialize the logging system.
///
/// The file layer always records JSON. With `console` set, a human-readable
/// layer is added on stderr so it never interleaves with program output.
pub fn init_logging(console: bool) -> anyhow::Result<LogGuard> {
    let log_dir = super::log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = console.then(|| {
        let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        #[cfg(debug_assertions)]
        let layer = layer.pretty();
        layer
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(fmt::layer().json().with_writer(non_blocking))
        .try_init()?;

    tracing::info!(dir = %log_dir.display(), "Logging initialized");
    Ok(guard)
}

/// Clean up log files in the default log directory older than `days`
pub fn cleanup_old_logs(days: u32) -> anyhow::Result<usize> {
    cleanup_logs_in(&super::log_dir(), days)
}

/// Remove rolled log files in `dir` whose modification time is older than `days`
pub fn cleanup_logs_in(dir: &Path, days: u32) -> anyhow::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let threshold = SystemTime::now() - Duration::from_secs(days as u64 * 24 * 60 * 60);
    let mut deleted = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_log = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with(LOG_FILE_PREFIX))
            .unwrap_or(false);
        if !is_log {
            continue;
        }

        let stale = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| modified < threshold)
            .unwrap_or(false);
        if stale && std::fs::remove_file(&path).is_ok() {
            deleted += 1;
            tracing::debug!("Deleted old log: {:?}", path);
        }
    }

    if deleted > 0 {
        tracing::info!("Cleaned up {} old log files", deleted);
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age: Duration) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_cleanup_removes_only_old_logs() {
        let dir = TempDir::new().unwrap();
        let day = Duration::from_secs(24 * 60 * 60);
        touch(dir.path(), "photo_culler.log.2020-01-01", day * 40);
        touch(dir.path(), "photo_culler.log.2020-02-01", day);
        touch(dir.path(), "notes.txt", day * 40);

        let deleted = cleanup_logs_in(dir.path(), 30).unwrap();

        assert_eq!(deleted, 1);
        assert!(!dir.path().join("photo_culler.log.2020-01-01").exists());
        assert!(dir.path().join("photo_culler.log.2020-02-01").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(cleanup_logs_in(&dir.path().join("none"), 1).unwrap(), 0);
    }
}
