use std::sync::Arc;

use crate::config::Config;
use crate::error::LogError;
use crate::logger::Logger;
use crate::registry;

/// Registry name of the logger created by [`init`].
pub const DEFAULT_LOGGER: &str = "default";

/// Keeps the process logger alive and archives old log folders when
/// dropped.
///
/// Hold it in `main` for the lifetime of the program; dropping it at the
/// end of `main` is the normal-exit hook. Nothing runs if the process is
/// aborted or killed.
#[must_use = "dropping the guard immediately runs the shutdown sweep"]
pub struct ShutdownGuard {
    logger: Arc<Logger>,
}

impl ShutdownGuard {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        if let Some(report) = self.logger.shutdown() {
            tracing::debug!(
                archived = report.archived.len(),
                failed = report.failed.len(),
                "shutdown sweep finished"
            );
        }
    }
}

/// Create (or fetch) the process logger registered as [`DEFAULT_LOGGER`].
///
/// **Parameters**
/// - `config`: configuration view; missing logger keys are filled with
///   defaults. Ignored if the default logger already exists.
///
/// **Returns**
/// - the shared [`Logger`] and a [`ShutdownGuard`] that runs the archival
///   sweep once when dropped.
pub fn init(config: Config) -> Result<(Arc<Logger>, ShutdownGuard), LogError> {
    let logger = registry::shared(DEFAULT_LOGGER, || Logger::new(config))?;
    Ok((Arc::clone(&logger), ShutdownGuard::new(logger)))
}

/// Install a global `tracing` subscriber that forwards every event to
/// `logger`.
///
/// **Effects**
///
/// Installs a [`Registry`](tracing_subscriber::Registry) combined with
/// [`LoggerLayer`](crate::layer::LoggerLayer) as the global default
/// subscriber, so `tracing` macros anywhere in the process end up in the
/// logger's sink. Fails if a global subscriber is already set.
#[cfg(feature = "tracing-bridge")]
pub fn init_tracing(logger: Arc<Logger>) -> Result<(), LogError> {
    use tracing_subscriber::layer::SubscriberExt;

    let subscriber = tracing_subscriber::Registry::default().with(crate::layer::LoggerLayer::new(logger));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_guard_sweeps_on_drop() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("2020").join("march");
        std::fs::create_dir_all(&old).unwrap();
        std::fs::write(old.join("2020-03-01_locklog.0.log"), "old\n").unwrap();

        let config = Config::new()
            .with("LOGGER", "handler", "none")
            .with("FOLDERS", "logger", dir.path().to_string_lossy());
        let logger = Arc::new(Logger::new(config).unwrap());

        drop(ShutdownGuard::new(Arc::clone(&logger)));

        assert!(logger.sweeper().has_run());
        assert!(dir.path().join("2020").join("march.zip").exists());
        assert!(!old.exists());
    }

    #[test]
    fn test_init_returns_registered_logger() {
        let dir = TempDir::new().unwrap();
        let config = Config::new()
            .with("LOGGER", "handler", "none")
            .with("FOLDERS", "logger", dir.path().to_string_lossy());
        let (logger, guard) = init(config).unwrap();
        assert!(Arc::ptr_eq(&logger, guard.logger()));
        assert!(Arc::ptr_eq(&logger, &registry::get(DEFAULT_LOGGER).unwrap()));

        drop(guard);
        assert!(logger.sweeper().has_run());
        registry::remove(DEFAULT_LOGGER);
    }
}
