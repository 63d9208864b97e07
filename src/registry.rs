//! Process-wide loggers shared by logical name.
//!
//! The first caller of [`shared`] for a name constructs the logger while
//! holding the registry lock; every later caller receives the same
//! instance. The `init` closure must not call back into the registry.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::LogError;
use crate::logger::Logger;

static LOGGERS: Lazy<Mutex<HashMap<String, Arc<Logger>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Return the logger registered under `name`, building it with `init`
/// on first use.
///
/// If `init` fails nothing is registered and the next call retries.
pub fn shared<F>(name: &str, init: F) -> Result<Arc<Logger>, LogError>
where
    F: FnOnce() -> Result<Logger, LogError>,
{
    let mut loggers = LOGGERS.lock();
    if let Some(logger) = loggers.get(name) {
        return Ok(Arc::clone(logger));
    }

    let logger = Arc::new(init()?);
    loggers.insert(name.to_string(), Arc::clone(&logger));
    Ok(logger)
}

/// The logger registered under `name`, if any.
pub fn get(name: &str) -> Option<Arc<Logger>> {
    LOGGERS.lock().get(name).cloned()
}

/// Unregister `name`. Holders of the returned instance keep using it.
pub fn remove(name: &str) -> Option<Arc<Logger>> {
    LOGGERS.lock().remove(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn quiet() -> Result<Logger, LogError> {
        Logger::new(Config::new().with("LOGGER", "handler", "none"))
    }

    #[test]
    fn test_shared_builds_once_across_threads() {
        let builds = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let builds = Arc::clone(&builds);
                thread::spawn(move || {
                    shared("registry-test-threads", || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        quiet()
                    })
                    .unwrap()
                })
            })
            .collect();
        let loggers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(loggers.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        remove("registry-test-threads");
    }

    #[test]
    fn test_failed_init_is_not_registered() {
        let err = shared("registry-test-failure", || {
            Logger::new(Config::new().with("LOGGER", "handler", "fax"))
        });
        assert!(err.is_err());
        assert!(get("registry-test-failure").is_none());

        let logger = shared("registry-test-failure", quiet).unwrap();
        assert!(Arc::ptr_eq(&logger, &remove("registry-test-failure").unwrap()));
        assert!(get("registry-test-failure").is_none());
    }
}
