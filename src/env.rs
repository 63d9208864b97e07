/// Environment variable names that override configuration keys.
///
/// These are purely helpers; [`Config`](crate::Config) only reads them
/// when [`Config::with_env_overrides`](crate::Config::with_env_overrides)
/// is called.

/// Active sink: `console`, `file` or `none` (`LOGGER.handler`).
pub const LOCKLOG_HANDLER_ENV: &str = "LOCKLOG_HANDLER";

/// Whether `debug` lines are emitted (`LOGGER.debug`).
pub const LOCKLOG_DEBUG_ENV: &str = "LOCKLOG_DEBUG";

/// Base log file name, e.g. `service.log` (`LOGGER.name`).
pub const LOCKLOG_NAME_ENV: &str = "LOCKLOG_NAME";

/// Root folder for rotated and archived logs (`FOLDERS.logger`).
pub const LOCKLOG_FOLDER_ENV: &str = "LOCKLOG_FOLDER";

/// Rotation ceiling in bytes (`LOGGER.max_bytes`).
pub const LOCKLOG_MAX_BYTES_ENV: &str = "LOCKLOG_MAX_BYTES";

/// `(variable, section, key)` triples applied by `with_env_overrides`.
pub const ENV_OVERRIDES: &[(&str, &str, &str)] = &[
    (LOCKLOG_HANDLER_ENV, "LOGGER", "handler"),
    (LOCKLOG_DEBUG_ENV, "LOGGER", "debug"),
    (LOCKLOG_NAME_ENV, "LOGGER", "name"),
    (LOCKLOG_FOLDER_ENV, "FOLDERS", "logger"),
    (LOCKLOG_MAX_BYTES_ENV, "LOGGER", "max_bytes"),
];

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
