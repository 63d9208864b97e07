use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::error::LogError;
use crate::file_sink::RotatingFileSink;
use crate::noop_sink::NoopSink;
use crate::sink::{ConsoleSink, LogSink};

/// Supported sink kinds that can be selected via `LOGGER.handler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File,
    None,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::None => "none",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a handler name, case-insensitively.
///
/// Examples: `console`, `file`, `none`.
impl FromStr for SinkKind {
    type Err = SinkKindError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(SinkKind::Console),
            "file" => Ok(SinkKind::File),
            "none" => Ok(SinkKind::None),
            _ => Err(SinkKindError::UnknownHandler(name.to_string())),
        }
    }
}

/// Error type returned when parsing a handler name.
#[derive(thiserror::Error, Debug)]
pub enum SinkKindError {
    #[error("unknown log handler `{0}`, expected one of: console, file, none")]
    UnknownHandler(String),
}

/// Create the [`LogSink`] named by `LOGGER.handler`.
///
/// This is the entry point used by [`Logger::new`](crate::Logger::new);
/// applications that need a custom destination pass their own sink to
/// [`Logger::with_sink`](crate::Logger::with_sink) instead.
pub fn make_sink_from_config(config: &Config) -> Result<Arc<dyn LogSink>, LogError> {
    let sink: Arc<dyn LogSink> = match config.handler().parse::<SinkKind>()? {
        SinkKind::Console => Arc::new(ConsoleSink::new()),
        SinkKind::File => Arc::new(RotatingFileSink::from_config(config)?),
        SinkKind::None => Arc::new(NoopSink),
    };
    Ok(sink)
}
