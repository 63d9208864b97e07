use std::fmt;
use std::panic::Location;

use chrono::Local;

/// Timestamp layout of [`LogRecord::time`], local time with microseconds.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Code name used when the enclosing function is not known.
pub const UNKNOWN_CODE: &str = "-";

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source location a log line is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: String,
    pub line: u32,
    pub code: String,
}

impl Frame {
    pub fn new(file: impl Into<String>, line: u32, code: impl Into<String>) -> Self {
        Self { file: file.into(), line, code: code.into() }
    }

    /// Location of the nearest caller that is not itself `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line(), UNKNOWN_CODE)
    }
}

/// Where an error was raised or handled, and what it said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSite {
    pub file: String,
    pub line: u32,
    pub code: String,
    pub message: String,
}

impl ErrorSite {
    pub fn new(frame: Frame, message: impl Into<String>) -> Self {
        Self { file: frame.file, line: frame.line, code: frame.code, message: message.into() }
    }

    /// Capture `error` at the calling location.
    ///
    /// Use [`error_site!`](crate::error_site) to also record the module path.
    #[track_caller]
    pub fn capture<E: fmt::Display + ?Sized>(error: &E) -> Self {
        Self::new(Frame::caller(), error.to_string())
    }

    fn frame(&self) -> Frame {
        Frame::new(self.file.clone(), self.line, self.code.clone())
    }
}

/// What a log line should be attributed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Attribution {
    /// The caller of the logger.
    #[default]
    None,
    /// An error; its site replaces the caller and its message is appended.
    Site(ErrorSite),
}

impl From<ErrorSite> for Attribution {
    fn from(site: ErrorSite) -> Self {
        Attribution::Site(site)
    }
}

impl From<Option<ErrorSite>> for Attribution {
    fn from(site: Option<ErrorSite>) -> Self {
        site.map_or(Attribution::None, Attribution::Site)
    }
}

/// One immutable log line before formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub time: String,
    pub level: Level,
    pub file: String,
    pub line: u32,
    pub code: String,
    pub message: String,
}

/// Builds [`LogRecord`]s from a message and its attribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowFactory;

impl RowFactory {
    /// Stamp a new record with the current local time.
    ///
    /// With [`Attribution::Site`] the record points at the error site and
    /// the message gets ` Traceback: <error message>` appended; otherwise
    /// it points at `caller`.
    pub fn build(&self, level: Level, message: &str, attribution: &Attribution, caller: Frame) -> LogRecord {
        let (frame, message) = match attribution {
            Attribution::None => (caller, message.to_string()),
            Attribution::Site(site) => (site.frame(), format!("{message} Traceback: {}", site.message)),
        };

        LogRecord {
            time: Local::now().format(TIME_FORMAT).to_string(),
            level,
            file: frame.file,
            line: frame.line,
            code: frame.code,
            message,
        }
    }
}

/// Renders a record into the single line handed to a sink.
pub trait LineFormat: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}

/// `[time] - LEVEL - <file, line, code>: message`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormat;

impl LineFormat for DefaultFormat {
    fn format(&self, record: &LogRecord) -> String {
        format!(
            "[{}] - {} - <{}, {}, {}>: {}",
            record.time, record.level, record.file, record.line, record.code, record.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_build_attributes_caller() {
        let caller = Frame::new("src/main.rs", 42, "main");
        let row = RowFactory.build(Level::Info, "hello", &Attribution::None, caller);

        assert_eq!(row.level, Level::Info);
        assert_eq!((row.file.as_str(), row.line, row.code.as_str()), ("src/main.rs", 42, "main"));
        assert_eq!(row.message, "hello");
        NaiveDateTime::parse_from_str(&row.time, TIME_FORMAT).unwrap();
        assert_eq!(row.time.rsplit('.').next().unwrap().len(), 6);
    }

    #[test]
    fn test_build_attributes_error_site() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml is gone");
        let site = ErrorSite::new(Frame::new("src/config.rs", 7, "load"), err.to_string());
        let row = RowFactory.build(Level::Error, "startup failed", &site.into(), Frame::caller());

        assert_eq!((row.file.as_str(), row.line, row.code.as_str()), ("src/config.rs", 7, "load"));
        assert_eq!(row.message, "startup failed Traceback: config.toml is gone");
    }

    #[test]
    fn test_capture_uses_calling_location() {
        let err = std::fmt::Error;
        let line = line!() + 1;
        let site = ErrorSite::capture(&err);
        assert_eq!(site.file, file!());
        assert_eq!(site.line, line);
        assert_eq!(site.code, UNKNOWN_CODE);
    }

    #[test]
    fn test_default_format() {
        let row = LogRecord {
            time: "2026-10-16 09:15:02.123456".into(),
            level: Level::Warning,
            file: "src/lib.rs".into(),
            line: 3,
            code: "locklog::demo".into(),
            message: "disk almost full".into(),
        };
        assert_eq!(
            DefaultFormat.format(&row),
            "[2026-10-16 09:15:02.123456] - WARNING - <src/lib.rs, 3, locklog::demo>: disk almost full"
        );
    }
}
