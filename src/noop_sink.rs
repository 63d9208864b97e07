use crate::error::LogError;
use crate::sink::LogSink;

/// A sink that simply drops all lines.
///
/// Selected by `LOGGER.handler = none` so that call sites never have to
/// branch on whether logging is enabled. Also handy for measuring the
/// overhead of the logger itself without any I/O.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn emit(&self, _line: &str) -> Result<(), LogError> {
        Ok(())
    }
}
