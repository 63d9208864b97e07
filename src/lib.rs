pub mod archive;
pub mod backend;
pub mod config;
pub mod env;
pub mod error;
pub mod file_sink;
pub mod handle;
pub mod init;
pub mod lock;
pub mod logger;
mod macros;
pub mod noop_sink;
pub mod record;
pub mod registry;
pub mod sink;

#[cfg(feature = "tracing-bridge")]
pub mod layer;

pub use config::Config;
pub use error::LogError;
pub use logger::Logger;
pub use record::{Attribution, ErrorSite, Frame, Level, LogRecord};
pub use sink::LogSink;
