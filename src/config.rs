//! Read-only configuration view consumed by the logger.
//!
//! Values live in `section -> key -> string` tables, the shape of an
//! ini file. Files are written in TOML where every table is a section:
//!
//! ```toml
//! [LOGGER]
//! handler = "file"
//! name = "service.log"
//! debug = true
//!
//! [FOLDERS]
//! logger = "/var/log/service"
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::env::ENV_OVERRIDES;

pub const LOGGER_SECTION: &str = "LOGGER";
pub const FOLDERS_SECTION: &str = "FOLDERS";

pub const DEFAULT_FOLDER: &str = "logs";
pub const DEFAULT_NAME: &str = "locklog.log";
pub const DEFAULT_HANDLER: &str = "console";

/// Size at which the file sink starts a new file: 1 MiB - 1 KiB.
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024 - 1024;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing configuration key `{section}.{key}`")]
    Missing { section: String, key: String },

    #[error("`{section}.{key}` is not a boolean: `{value}`")]
    InvalidBool { section: String, key: String, value: String },

    #[error("`{section}.{key}` is not an unsigned integer: `{value}`")]
    InvalidInt { section: String, key: String, value: String },

    #[error("failed to read config file `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl RawValue {
    fn into_string(self) -> String {
        match self {
            RawValue::Bool(value) => value.to_string(),
            RawValue::Int(value) => value.to_string(),
            RawValue::Float(value) => value.to_string(),
            RawValue::Str(value) => value,
        }
    }
}

/// Section/key/value configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration holding only the logger defaults.
    pub fn with_defaults() -> Self {
        let mut config = Self::new();
        config.apply_defaults();
        config
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, BTreeMap<String, RawValue>> = toml::from_str(source)?;
        let sections = raw
            .into_iter()
            .map(|(section, values)| {
                let values = values
                    .into_iter()
                    .map(|(key, value)| (key, value.into_string()))
                    .collect();
                (section, values)
            })
            .collect();
        Ok(Self { sections })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&source)
    }

    /// Apply every variable from [`ENV_OVERRIDES`] that is set.
    pub fn with_env_overrides(mut self) -> Self {
        for (variable, section, key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(variable) {
                self.set(section, key, value);
            }
        }
        self
    }

    pub fn get(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        self.lookup(section, key).ok_or_else(|| ConfigError::Missing {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    pub fn get_or<'a>(&'a self, section: &str, key: &str, fallback: &'a str) -> &'a str {
        self.lookup(section, key).unwrap_or(fallback)
    }

    /// Parse a boolean the way ini parsers do: `1/yes/true/on` and
    /// `0/no/false/off`, case-insensitive.
    pub fn get_bool(&self, section: &str, key: &str) -> Result<bool, ConfigError> {
        let value = self.get(section, key)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(true),
            "0" | "no" | "false" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool {
                section: section.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn get_bool_or(&self, section: &str, key: &str, fallback: bool) -> Result<bool, ConfigError> {
        match self.lookup(section, key) {
            Some(_) => self.get_bool(section, key),
            None => Ok(fallback),
        }
    }

    pub fn get_u64_or(&self, section: &str, key: &str, fallback: u64) -> Result<u64, ConfigError> {
        match self.lookup(section, key) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidInt {
                section: section.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            }),
            None => Ok(fallback),
        }
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) -> &mut Self {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    /// Builder form of [`Config::set`].
    pub fn with(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.set(section, key, value);
        self
    }

    /// Set `section.key` only if it is absent.
    pub fn set_default(&mut self, section: &str, key: &str, value: impl Into<String>) -> &mut Self {
        self.sections
            .entry(section.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(|| value.into());
        self
    }

    /// Fill in every logger key that is still missing.
    pub fn apply_defaults(&mut self) -> &mut Self {
        self.set_default(FOLDERS_SECTION, "logger", DEFAULT_FOLDER)
            .set_default(LOGGER_SECTION, "name", DEFAULT_NAME)
            .set_default(LOGGER_SECTION, "handler", DEFAULT_HANDLER)
            .set_default(LOGGER_SECTION, "debug", "false")
    }

    /// `LOGGER.handler`.
    pub fn handler(&self) -> &str {
        self.get_or(LOGGER_SECTION, "handler", DEFAULT_HANDLER)
    }

    /// `LOGGER.debug`, `false` when absent.
    pub fn debug_enabled(&self) -> Result<bool, ConfigError> {
        self.get_bool_or(LOGGER_SECTION, "debug", false)
    }

    /// `LOGGER.name`, the base log file name including its extension.
    pub fn log_name(&self) -> &str {
        self.get_or(LOGGER_SECTION, "name", DEFAULT_NAME)
    }

    /// `FOLDERS.logger`, the root of rotated and archived logs.
    pub fn log_root(&self) -> PathBuf {
        PathBuf::from(self.get_or(FOLDERS_SECTION, "logger", DEFAULT_FOLDER))
    }

    /// `LOGGER.max_bytes`, the rotation ceiling.
    pub fn max_bytes(&self) -> Result<u64, ConfigError> {
        self.get_u64_or(LOGGER_SECTION, "max_bytes", DEFAULT_MAX_BYTES)
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|values| values.get(key))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str_stringifies_values() {
        let config = Config::from_toml_str(
            r#"
            [LOGGER]
            handler = "file"
            debug = true
            max_bytes = 4096

            [FOLDERS]
            logger = "/var/log/demo"
            "#,
        )
        .unwrap();

        assert_eq!(config.handler(), "file");
        assert!(config.debug_enabled().unwrap());
        assert_eq!(config.max_bytes().unwrap(), 4096);
        assert_eq!(config.log_root(), PathBuf::from("/var/log/demo"));
    }

    #[test]
    fn test_missing_key_without_fallback() {
        let err = Config::new().get(LOGGER_SECTION, "handler").unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
        assert_eq!(err.to_string(), "missing configuration key `LOGGER.handler`");
    }

    #[test]
    fn test_bool_spellings() {
        for (value, expected) in [("Yes", true), ("on", true), ("1", true), ("OFF", false), ("no", false)] {
            let config = Config::new().with(LOGGER_SECTION, "debug", value);
            assert_eq!(config.debug_enabled().unwrap(), expected, "{value}");
        }

        let config = Config::new().with(LOGGER_SECTION, "debug", "maybe");
        assert!(matches!(config.debug_enabled(), Err(ConfigError::InvalidBool { .. })));
    }

    #[test]
    fn test_defaults_only_fill_missing_keys() {
        let mut config = Config::new().with(LOGGER_SECTION, "handler", "file");
        config.apply_defaults();

        assert_eq!(config.handler(), "file");
        assert_eq!(config.log_name(), DEFAULT_NAME);
        assert_eq!(config.log_root(), PathBuf::from(DEFAULT_FOLDER));
        assert!(!config.debug_enabled().unwrap());
        assert_eq!(config.max_bytes().unwrap(), DEFAULT_MAX_BYTES);
    }

    #[test]
    fn test_invalid_max_bytes() {
        let config = Config::new().with(LOGGER_SECTION, "max_bytes", "lots");
        assert!(matches!(config.max_bytes(), Err(ConfigError::InvalidInt { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/locklog/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
