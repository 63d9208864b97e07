//! Call-site capturing logging macros.
//!
//! Unlike the [`Logger`](crate::Logger) methods, these also record the
//! calling module path as the record's `code`, and accept `format!`
//! arguments:
//!
//! ```no_run
//! # fn run(logger: &locklog::Logger) -> Result<(), locklog::LogError> {
//! locklog::info!(logger, "listening on port {}", 8080)?;
//! if let Err(err) = std::fs::read("cache.bin") {
//!     locklog::warning!(logger, err = err, "cache unavailable, starting cold")?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Each macro evaluates to the `Result` of [`Logger::emit`](crate::Logger::emit).

/// Build an [`ErrorSite`](crate::ErrorSite) for an error value at the
/// current location, including the module path.
#[macro_export]
macro_rules! error_site {
    ($err:expr) => {
        $crate::ErrorSite::new(
            $crate::Frame::new(::std::file!(), ::std::line!(), ::std::module_path!()),
            ::std::string::ToString::to_string(&$err),
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __locklog_emit {
    ($logger:expr, $level:expr, err = $err:expr, $($arg:tt)+) => {
        $logger.emit(
            $level,
            &::std::format!($($arg)+),
            $crate::Attribution::from($crate::error_site!($err)),
            $crate::Frame::new(::std::file!(), ::std::line!(), ::std::module_path!()),
        )
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.emit(
            $level,
            &::std::format!($($arg)+),
            $crate::Attribution::None,
            $crate::Frame::new(::std::file!(), ::std::line!(), ::std::module_path!()),
        )
    };
}

/// Log at `DEBUG` (only written when `LOGGER.debug` is true).
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($rest:tt)+) => {
        $crate::__locklog_emit!($logger, $crate::Level::Debug, $($rest)+)
    };
}

/// Log at `INFO`.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($rest:tt)+) => {
        $crate::__locklog_emit!($logger, $crate::Level::Info, $($rest)+)
    };
}

/// Log at `WARNING`.
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($rest:tt)+) => {
        $crate::__locklog_emit!($logger, $crate::Level::Warning, $($rest)+)
    };
}

/// Log at `ERROR`.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($rest:tt)+) => {
        $crate::__locklog_emit!($logger, $crate::Level::Error, $($rest)+)
    };
}

/// Log at `CRITICAL`.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($rest:tt)+) => {
        $crate::__locklog_emit!($logger, $crate::Level::Critical, $($rest)+)
    };
}
