use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::LogError;

/// Destination for formatted log lines.
///
/// Implementations are called by [`Logger`](crate::Logger) while it holds
/// its emission lock, so one call to `emit` never interleaves with another
/// call on the same logger. Implementations shared between loggers must
/// still be safe to call from several threads at once.
pub trait LogSink: Send + Sync {
    /// Persist or display one formatted line (without trailing newline).
    ///
    /// **Returns**
    /// - `Ok(())` once the line has been handed to the destination.
    /// - `Err(..)` if the destination failed (open, lock or write error).
    ///   The logger passes the error on to its caller.
    fn emit(&self, line: &str) -> Result<(), LogError>;

    /// Flush any buffered lines.
    ///
    /// Default implementation is a no-op.
    fn flush(&self) -> Result<(), LogError> {
        Ok(())
    }
}

/// Writes each line to standard output and flushes before returning.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Console sink writing to `out` instead of standard output.
    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Mutex::new(Box::new(out)) }
    }

    fn write_error(source: io::Error) -> LogError {
        LogError::io("failed to write to", PathBuf::from("<console>"), source)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

impl LogSink for ConsoleSink {
    fn emit(&self, line: &str) -> Result<(), LogError> {
        let mut out = self.out.lock();
        writeln!(out, "{line}")
            .and_then(|_| out.flush())
            .map_err(Self::write_error)
    }

    fn flush(&self) -> Result<(), LogError> {
        self.out.lock().flush().map_err(Self::write_error)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FlushedBuffer;
    use super::*;

    #[test]
    fn test_console_writes_one_flushed_line() {
        let out = FlushedBuffer::default();
        let sink = ConsoleSink::with_writer(out.clone());

        sink.emit("first").unwrap();
        assert_eq!(out.flushed(), "first\n");

        sink.emit("second").unwrap();
        assert_eq!(out.flushed(), "first\nsecond\n");
    }
}
