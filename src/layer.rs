use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::logger::Logger;
use crate::record::{Attribution, Frame, Level};

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// `tracing_subscriber` layer that forwards events to a [`Logger`].
///
/// Levels map as TRACE/DEBUG → `DEBUG`, INFO → `INFO`, WARN → `WARNING`
/// and ERROR → `ERROR`; `debug` lines still obey `LOGGER.debug`. The
/// record is attributed to the event's file and line with its target as
/// code, and the message is followed by the event's fields as
/// ` key=value` pairs. Events emitted by this crate itself are skipped so
/// the logger never logs its own diagnostics.
pub struct LoggerLayer {
    logger: Arc<Logger>,
    /// Events written by the logger. Filtered `debug` events are not counted.
    pub forwarded_events: Arc<AtomicU64>,
    /// Events the logger failed to write.
    pub failed_events: Arc<AtomicU64>,
}

impl LoggerLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            forwarded_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

fn is_own_target(target: &str) -> bool {
    target == OWN_TARGET
        || target
            .strip_prefix(OWN_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

fn map_level(level: &tracing::Level) -> Level {
    if *level == tracing::Level::ERROR {
        Level::Error
    } else if *level == tracing::Level::WARN {
        Level::Warning
    } else if *level == tracing::Level::INFO {
        Level::Info
    } else {
        Level::Debug
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_own_target(meta.target()) {
            return;
        }

        let level = map_level(meta.level());
        let written = self.logger.enabled(level).and_then(|enabled| {
            if !enabled {
                return Ok(false);
            }
            let mut visitor = FieldVisitor::default();
            event.record(&mut visitor);

            let frame = Frame::new(meta.file().unwrap_or("<unknown>"), meta.line().unwrap_or(0), meta.target());
            self.logger.emit(level, &visitor.finish(), Attribution::None, frame).map(|()| true)
        });
        match written {
            Ok(true) => {
                self.forwarded_events.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("failed to forward tracing event: {}", e);
            }
        }
    }
}

/// Collects an event's message and its remaining fields as text.
#[derive(Default)]
pub struct FieldVisitor {
    message: String,
    fields: String,
}

impl FieldVisitor {
    /// `message key=value key=value`
    pub fn finish(self) -> String {
        let mut line = self.message;
        line.push_str(&self.fields);
        line
    }

    fn push_field(&mut self, field: &Field, value: impl std::fmt::Display) {
        let _ = write!(self.fields, " {}={}", field.name(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field, value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push_field(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push_field(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push_field(field, value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push_field(field, format_args!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sink::testing::MemorySink;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[test]
    fn test_own_target_detection() {
        assert!(is_own_target("locklog"));
        assert!(is_own_target("locklog::handle"));
        assert!(!is_own_target("locklog_demo"));
        assert!(!is_own_target("app"));
    }

    #[test]
    fn test_forwards_events_with_fields() {
        let sink = Arc::new(MemorySink::default());
        let logger = Arc::new(Logger::with_sink(Config::new(), sink.clone()));
        let layer = LoggerLayer::new(Arc::clone(&logger));
        let forwarded = Arc::clone(&layer.forwarded_events);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "app", user = "ada", attempts = 3, "login throttled");
            tracing::error!(target: "app::db", "connection lost");
            tracing::debug!(target: "app", "dropped while LOGGER.debug is off");
            tracing::info!("from this crate, ignored");
        });

        let lines = sink.lines();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[0].contains(" - WARNING - <"));
        assert!(lines[0].contains(", app>: login throttled"));
        assert!(lines[0].contains(" user=ada"));
        assert!(lines[0].contains(" attempts=3"));
        assert!(lines[1].contains(" - ERROR - <"));
        assert!(lines[1].ends_with(", app::db>: connection lost"));
        assert_eq!(forwarded.load(Ordering::Relaxed), 2);
    }
}
