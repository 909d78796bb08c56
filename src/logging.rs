//! Logging setup.
//!
//! Logs go to daily-rotated files when a log directory is configured, to
//! systemd's journal on Linux when it is reachable, and to stdout otherwise.
//!
//! Log level is controlled via the `GALLERY_LOG` environment variable
//! (`GALLERY_LOG=debug`, `GALLERY_LOG=gallery=debug,tower_http=info`, ...).
//! Without it the level is `info`, or `debug` when the debug flag is set.

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(log_dir: Option<&Path>, debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_env("GALLERY_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(log_dir) = log_dir {
        std::fs::create_dir_all(log_dir)?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "gallery.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The guard flushes on drop; keep it for the life of the process.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .try_init()?;

        tracing::info!("Logging initialized with file backend at {:?}", log_dir);
        return Ok(());
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer)
                .try_init()?;

            tracing::info!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .try_init()?;

    tracing::info!("Logging initialized on stdout");
    Ok(())
}
