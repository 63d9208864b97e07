use std::io;
use std::path::PathBuf;

use crate::backend::SinkKindError;
use crate::config::ConfigError;
use crate::lock::LockError;

/// Error type returned by the logger, its sinks and the archival sweep.
#[derive(thiserror::Error, Debug)]
pub enum LogError {
    #[error("lock failure on `{}`: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: LockError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sink(#[from] SinkKindError),

    #[error("{context} `{}`: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to archive `{}`: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to install the tracing bridge: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

impl LogError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        LogError::Io { context, path: path.into(), source }
    }
}
