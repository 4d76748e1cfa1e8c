//! Logging setup with a reloadable filter and local-time timestamps.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "dialog_sync=info,signed_token=info,sqlx=warn";

/// File name prefix of the rolling log.
const LOG_FILE_PREFIX: &str = "dialog-sync.log";

/// Timer that formats timestamps in the server's local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Type alias for the reload handle.
pub type FilterHandle = Handle<EnvFilter, tracing_subscriber::Registry>;

/// Handle on the installed subscriber.
pub struct LoggingConfig {
    handle: FilterHandle,
    log_dir: Option<PathBuf>,
}

impl LoggingConfig {
    /// Current filter directive.
    pub fn get_filter(&self) -> String {
        self.handle
            .with_current(|filter| filter.to_string())
            .unwrap_or_default()
    }

    /// Replace the filter directive at runtime.
    pub fn set_filter(&self, directive: &str) -> crate::Result<()> {
        let new_filter = EnvFilter::try_new(directive)
            .map_err(|e| crate::Error::Other(format!("Invalid filter directive: {}", e)))?;

        self.handle
            .reload(new_filter)
            .map_err(|e| crate::Error::Other(format!("Failed to reload filter: {}", e)))?;

        info!(directive = %directive, "Log filter updated");
        Ok(())
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Parse a directive, falling back to [`DEFAULT_LOG_FILTER`].
fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `directive`. With `log_dir` set, output is also
/// written to a daily-rolling file; keep the returned guard alive until exit
/// so buffered lines are flushed.
pub fn init_logging(
    directive: &str,
    log_dir: Option<&Path>,
) -> crate::Result<(Arc<LoggingConfig>, Option<WorkerGuard>)> {
    let (filter_layer, filter_handle) = reload::Layer::new(build_filter(directive));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    let config = Arc::new(LoggingConfig {
        handle: filter_handle,
        log_dir: log_dir.map(Path::to_path_buf),
    });

    Ok((config, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert!(DEFAULT_LOG_FILTER.contains("dialog_sync=info"));
        assert!(DEFAULT_LOG_FILTER.contains("sqlx=warn"));
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_reload_handle_reports_and_replaces_filter() {
        let (_layer, handle) = reload::Layer::<_, tracing_subscriber::Registry>::new(
            EnvFilter::new("dialog_sync=info"),
        );
        let config = LoggingConfig {
            handle,
            log_dir: None,
        };
        assert!(config.get_filter().contains("dialog_sync=info"));
        config.set_filter("dialog_sync=debug").unwrap();
        assert!(config.get_filter().contains("dialog_sync=debug"));
        assert!(config.set_filter("dialog_sync=notalevel").is_err());
    }
}
