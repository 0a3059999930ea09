//! Logging module for MahaCyberSafe

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging settings
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the daily rolling log file; stderr only when unset
    pub directory: Option<PathBuf>,
    pub file_name: String,
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: "cybersafe.log".to_string(),
            default_filter: "info".to_string(),
            ansi: true,
        }
    }
}

/// Initialize logging with tracing
///
/// Returns a guard when file logging is enabled. It must be kept alive for
/// the duration of the program or buffered lines are lost.
pub fn init_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!("Could not create log directory {}: {}", dir.display(), e);
            }
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, &config.file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(file_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.ansi),
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.default_filter)),
        )
        .try_init();

    if let Err(e) = result {
        tracing::debug!("Global subscriber already installed: {}", e);
    }

    guard
}
