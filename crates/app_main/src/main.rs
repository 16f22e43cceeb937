//! Photo Culler - metadata culling console
//!
//! Main entry point.

mod console;

use anyhow::{bail, Context, Result};
use app_core::{AppConfig, AppState};
use app_fs::{LocalBackend, MemoryBackend, PhotoBackend};
use std::sync::Arc;

const USAGE: &str = "usage: photo_culler [--dry-run] [folder]";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    /// Keep everything in memory; nothing on disk is touched
    dry_run: bool,
    folder: Option<String>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    for arg in args {
        match arg.as_str() {
            "--dry-run" | "-n" => parsed.dry_run = true,
            "--help" | "-h" => parsed.help = true,
            flag if flag.starts_with('-') => bail!("unknown option {}\n{}", flag, USAGE),
            _ if parsed.folder.is_some() => bail!("only one folder may be given\n{}", USAGE),
            _ => parsed.folder = Some(arg),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    // Logs go to the rolling file; stderr only when RUST_LOG asks for it
    let _log_guard = app_log::init(std::env::var_os("RUST_LOG").is_some())?;

    tracing::info!("Photo Culler starting...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) if e.is_fatal() => {
            tracing::error!("Startup aborted: {}", e);
            return Err(e).context("loading configuration");
        }
        Err(e) => {
            tracing::warn!("{}; using default configuration", e.user_message());
            AppConfig::default()
        }
    };

    let retention = config.general.log_retention_days;
    if retention > 0 {
        if let Err(e) = app_log::cleanup_old_logs(retention) {
            tracing::warn!("Failed to cleanup old logs: {}", e);
        }
    }

    let backend: Arc<dyn PhotoBackend> = if args.dry_run {
        tracing::info!("Dry run: using in-memory backend");
        Arc::new(MemoryBackend::new())
    } else {
        Arc::new(LocalBackend::new())
    };

    let state = AppState::new(config, backend);
    console::run(state, args.folder).await?;

    tracing::info!("Photo Culler stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(args(&[]).unwrap(), Args::default());

        let parsed = args(&["--dry-run", "/photos"]).unwrap();
        assert!(parsed.dry_run);
        assert_eq!(parsed.folder.as_deref(), Some("/photos"));

        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["/a", "/b"]).is_err());
    }
}
