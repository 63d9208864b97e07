use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use crate::archive::{SweepReport, Sweeper};
use crate::backend::make_sink_from_config;
use crate::config::Config;
use crate::error::LogError;
use crate::record::{Attribution, DefaultFormat, Frame, Level, LineFormat, RowFactory};
use crate::sink::LogSink;

/// Logging facade with per-severity methods.
///
/// Every method funnels into [`Logger::emit`], which builds, formats and
/// writes one record while holding a re-entrant lock shared by the whole
/// instance. Lines from concurrent threads therefore never interleave;
/// their order is the order in which threads acquire that lock, not
/// necessarily the order in which they called the logger.
///
/// `debug` lines are only written when `LOGGER.debug` is true. All other
/// levels are always written; there is no numeric threshold.
pub struct Logger {
    config: Config,
    factory: RowFactory,
    format: Box<dyn LineFormat>,
    sink: RwLock<Arc<dyn LogSink>>,
    emit_lock: ReentrantMutex<()>,
    sweeper: Sweeper,
}

impl Logger {
    /// Build a logger whose sink is selected by `LOGGER.handler`.
    ///
    /// Missing keys are filled with defaults first (see
    /// [`Config::apply_defaults`]).
    pub fn new(mut config: Config) -> Result<Self, LogError> {
        config.apply_defaults();
        let sink = make_sink_from_config(&config)?;
        Ok(Self::with_sink(config, sink))
    }

    /// Build a logger writing to `sink` regardless of `LOGGER.handler`.
    pub fn with_sink(mut config: Config, sink: Arc<dyn LogSink>) -> Self {
        config.apply_defaults();
        let sweeper = Sweeper::from_config(&config);
        Self {
            config,
            factory: RowFactory,
            format: Box::new(DefaultFormat),
            sink: RwLock::new(sink),
            emit_lock: ReentrantMutex::new(()),
            sweeper,
        }
    }

    /// Replace the line layout.
    pub fn with_format(mut self, format: impl LineFormat + 'static) -> Self {
        self.format = Box::new(format);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The sink currently receiving lines.
    pub fn sink(&self) -> Arc<dyn LogSink> {
        let sink = self.sink.read();
        Arc::clone(&*sink)
    }

    /// Redirect subsequent lines to `sink`.
    pub fn set_sink(&self, sink: Arc<dyn LogSink>) {
        let _guard = self.emit_lock.lock();
        *self.sink.write() = sink;
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    /// Log `message` at `DEBUG`, only if `LOGGER.debug` is true.
    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) -> Result<(), LogError> {
        self.emit(Level::Debug, message.as_ref(), Attribution::None, Frame::caller())
    }

    /// [`Logger::debug`] with an explicit attribution.
    #[track_caller]
    pub fn debug_with(&self, message: impl AsRef<str>, attribution: impl Into<Attribution>) -> Result<(), LogError> {
        self.emit(Level::Debug, message.as_ref(), attribution.into(), Frame::caller())
    }

    /// Log `message` at `INFO`.
    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) -> Result<(), LogError> {
        self.emit(Level::Info, message.as_ref(), Attribution::None, Frame::caller())
    }

    #[track_caller]
    pub fn info_with(&self, message: impl AsRef<str>, attribution: impl Into<Attribution>) -> Result<(), LogError> {
        self.emit(Level::Info, message.as_ref(), attribution.into(), Frame::caller())
    }

    /// Log `message` at `WARNING`.
    #[track_caller]
    pub fn warning(&self, message: impl AsRef<str>) -> Result<(), LogError> {
        self.emit(Level::Warning, message.as_ref(), Attribution::None, Frame::caller())
    }

    #[track_caller]
    pub fn warning_with(&self, message: impl AsRef<str>, attribution: impl Into<Attribution>) -> Result<(), LogError> {
        self.emit(Level::Warning, message.as_ref(), attribution.into(), Frame::caller())
    }

    /// Log `message` at `ERROR`.
    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) -> Result<(), LogError> {
        self.emit(Level::Error, message.as_ref(), Attribution::None, Frame::caller())
    }

    /// Log `message` at `ERROR`, attributed to an error site.
    ///
    /// ```no_run
    /// # fn run(logger: &locklog::Logger) -> Result<(), locklog::LogError> {
    /// if let Err(err) = std::fs::read("settings.toml") {
    ///     logger.error_with("could not read settings", locklog::ErrorSite::capture(&err))?;
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[track_caller]
    pub fn error_with(&self, message: impl AsRef<str>, attribution: impl Into<Attribution>) -> Result<(), LogError> {
        self.emit(Level::Error, message.as_ref(), attribution.into(), Frame::caller())
    }

    /// Log `message` at `CRITICAL`.
    #[track_caller]
    pub fn critical(&self, message: impl AsRef<str>) -> Result<(), LogError> {
        self.emit(Level::Critical, message.as_ref(), Attribution::None, Frame::caller())
    }

    #[track_caller]
    pub fn critical_with(&self, message: impl AsRef<str>, attribution: impl Into<Attribution>) -> Result<(), LogError> {
        self.emit(Level::Critical, message.as_ref(), attribution.into(), Frame::caller())
    }

    /// Whether a line at `level` would be written.
    ///
    /// Fails only when `LOGGER.debug` holds an invalid boolean.
    pub fn enabled(&self, level: Level) -> Result<bool, LogError> {
        Ok(level != Level::Debug || self.config.debug_enabled()?)
    }

    /// Build, format and write one record.
    ///
    /// Sink errors (open, lock or write failures) are returned as is.
    pub fn emit(&self, level: Level, message: &str, attribution: Attribution, caller: Frame) -> Result<(), LogError> {
        if !self.enabled(level)? {
            return Ok(());
        }

        let _guard = self.emit_lock.lock();
        let row = self.factory.build(level, message, &attribution, caller);
        let line = self.format.format(&row);
        self.sink().emit(&line)
    }

    pub fn flush(&self) -> Result<(), LogError> {
        let _guard = self.emit_lock.lock();
        self.sink().flush()
    }

    /// Flush the sink and run the archival sweep, once per logger.
    ///
    /// Returns `None` when the sweep already ran. Failures are reported
    /// through `tracing` and the returned report, never as a panic.
    pub fn shutdown(&self) -> Option<SweepReport> {
        if let Err(err) = self.flush() {
            tracing::warn!(error = %err, "failed to flush log sink on shutdown");
        }
        self.sweeper.run_once()
    }
}
