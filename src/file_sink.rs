//! Size- and date-rotated log files.
//!
//! Files are laid out as `<root>/<year>/<month>/<date>_<base>.<index>.<ext>`,
//! e.g. `logs/2026/october/2026-10-16_service.0.log`. The sink binds a
//! path lazily on the first write and binds a fresh one whenever the
//! current file has reached the size ceiling or the local date changed.
//! `index` only ever grows within one sink, and a name that already exists
//! on disk is skipped, so the sink never appends to a file it did not
//! create itself.

use std::fs::{self, OpenOptions};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate};
use parking_lot::Mutex;

use crate::config::{Config, ConfigError, DEFAULT_MAX_BYTES};
use crate::error::LogError;
use crate::handle::{FileHandle, OpenMode};
use crate::sink::LogSink;

/// Lower-case English month name, as used for month folders.
pub fn month_name(date: NaiveDate) -> String {
    date.format("%B").to_string().to_lowercase()
}

/// `<root>/<year>/<month>` for `date`.
pub fn month_folder(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(date.year().to_string()).join(month_name(date))
}

/// Mutable cursor of a [`RotatingFileSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkState {
    pub current_path: Option<PathBuf>,
    pub folder: Option<PathBuf>,
    pub bound_on: Option<NaiveDate>,
    pub base_name: String,
    pub extension: String,
    /// Next index to try when binding a path.
    pub rotation_index: u64,
    pub bytes_written: u64,
}

impl FileSinkState {
    fn new(name: &str) -> Self {
        let path = Path::new(name);
        let base_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());

        Self {
            current_path: None,
            folder: None,
            bound_on: None,
            base_name,
            extension,
            rotation_index: 0,
            bytes_written: 0,
        }
    }

    fn file_name(&self, date: NaiveDate, index: u64) -> String {
        format!("{}_{}.{}.{}", date.format("%Y-%m-%d"), self.base_name, index, self.extension)
    }
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// [`LogSink`] that appends to rotated files through a [`FileHandle`].
pub struct RotatingFileSink {
    root: PathBuf,
    max_bytes: u64,
    handle: FileHandle,
    state: Mutex<FileSinkState>,
    today: Clock,
}

impl RotatingFileSink {
    /// Sink writing under `root` with base file name `name` (`service.log`).
    pub fn new(root: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            root: root.into(),
            max_bytes: DEFAULT_MAX_BYTES,
            handle: FileHandle::new(),
            state: Mutex::new(FileSinkState::new(name)),
            today: Box::new(|| Local::now().date_naive()),
        }
    }

    /// Sink configured from `FOLDERS.logger`, `LOGGER.name` and `LOGGER.max_bytes`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.log_root(), config.log_name()).with_max_bytes(config.max_bytes()?))
    }

    /// Start a new file once a file has grown to `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes.max(1);
        self
    }

    /// Replace the source of "today" used for folder and file names.
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy of the current cursor.
    pub fn state(&self) -> FileSinkState {
        self.state.lock().clone()
    }

    fn resolve_path(&self, state: &mut FileSinkState) -> Result<PathBuf, LogError> {
        let today = (self.today)();
        if let Some(path) = &state.current_path {
            if state.bytes_written < self.max_bytes && state.bound_on == Some(today) {
                return Ok(path.clone());
            }
        }
        self.bind(state, today)
    }

    fn bind(&self, state: &mut FileSinkState, today: NaiveDate) -> Result<PathBuf, LogError> {
        let folder = month_folder(&self.root, today);
        // create_dir_all treats a concurrently created folder as success.
        fs::create_dir_all(&folder)
            .map_err(|source| LogError::io("failed to create log folder", &folder, source))?;

        loop {
            let index = state.rotation_index;
            state.rotation_index += 1;
            let path = folder.join(state.file_name(today, index));

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    tracing::debug!(path = %path.display(), index, "bound log file");
                    state.current_path = Some(path.clone());
                    state.folder = Some(folder);
                    state.bound_on = Some(today);
                    state.bytes_written = 0;
                    return Ok(path);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(LogError::io("failed to create log file", &path, source)),
            }
        }
    }
}

impl LogSink for RotatingFileSink {
    fn emit(&self, line: &str) -> Result<(), LogError> {
        let mut state = self.state.lock();
        let path = self.resolve_path(&mut state)?;

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        let mut file = self.handle.acquire(&path, OpenMode::Append)?;
        file.write_all(record.as_bytes())
            .map_err(|source| LogError::io("failed to write", &path, source))?;
        state.bytes_written = file
            .stream_position()
            .map_err(|source| LogError::io("failed to query offset of", &path, source))?;
        file.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixed(date: NaiveDate) -> impl Fn() -> NaiveDate + Send + Sync + 'static {
        move || date
    }

    #[test]
    fn test_month_folder_layout() {
        let folder = month_folder(Path::new("logs"), day(2026, 10, 16));
        assert_eq!(folder, Path::new("logs").join("2026").join("october"));
    }

    #[test]
    fn test_first_write_binds_path() {
        let dir = TempDir::new().unwrap();
        let sink = RotatingFileSink::new(dir.path(), "service.log").with_clock(fixed(day(2026, 10, 16)));
        assert!(sink.state().current_path.is_none());

        sink.emit("hello").unwrap();

        let expected = dir.path().join("2026").join("october").join("2026-10-16_service.0.log");
        let state = sink.state();
        assert_eq!(state.current_path.as_deref(), Some(expected.as_path()));
        assert_eq!(state.bytes_written, 6);
        assert_eq!(fs::read_to_string(expected).unwrap(), "hello\n");
    }

    #[test]
    fn test_name_without_extension_defaults_to_log() {
        let dir = TempDir::new().unwrap();
        let sink = RotatingFileSink::new(dir.path(), "service").with_clock(fixed(day(2026, 10, 16)));
        sink.emit("x").unwrap();
        let path = sink.state().current_path.unwrap();
        assert!(path.ends_with("2026-10-16_service.0.log"));
    }

    #[test]
    fn test_existing_names_are_skipped() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("2026").join("october");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("2026-10-16_service.0.log"), "earlier run\n").unwrap();
        fs::write(folder.join("2026-10-16_service.1.log"), "other process\n").unwrap();

        let sink = RotatingFileSink::new(dir.path(), "service.log").with_clock(fixed(day(2026, 10, 16)));
        sink.emit("fresh").unwrap();

        assert!(sink.state().current_path.unwrap().ends_with("2026-10-16_service.2.log"));
        assert_eq!(fs::read_to_string(folder.join("2026-10-16_service.0.log")).unwrap(), "earlier run\n");
        assert_eq!(fs::read_to_string(folder.join("2026-10-16_service.1.log")).unwrap(), "other process\n");
    }

    #[test]
    fn test_rotates_at_size_ceiling() {
        let dir = TempDir::new().unwrap();
        let max_bytes = 256;
        let sink = RotatingFileSink::new(dir.path(), "service.log")
            .with_max_bytes(max_bytes)
            .with_clock(fixed(day(2026, 10, 16)));
        let line = "x".repeat(50);

        for _ in 0..20 {
            sink.emit(&line).unwrap();
        }

        let folder = dir.path().join("2026").join("october");
        let mut files: Vec<_> = fs::read_dir(&folder).unwrap().map(|e| e.unwrap().path()).collect();
        files.sort();
        assert!(files.len() > 1);

        let mut lines = 0;
        for file in &files {
            let len = fs::metadata(file).unwrap().len();
            assert!(len <= max_bytes + line.len() as u64 + 1, "{} is {len} bytes", file.display());
            lines += fs::read_to_string(file).unwrap().lines().count();
        }
        assert_eq!(lines, 20);
        // 51-byte records: the sixth crosses 256 bytes, the seventh opens index 1.
        assert_eq!(fs::read_to_string(folder.join("2026-10-16_service.0.log")).unwrap().lines().count(), 6);
        assert_eq!(sink.state().rotation_index, files.len() as u64);
    }

    #[test]
    fn test_date_change_rebinds_without_reusing_index() {
        let dir = TempDir::new().unwrap();
        let today = Arc::new(Mutex::new(day(2026, 10, 31)));
        let clock = Arc::clone(&today);
        let sink = RotatingFileSink::new(dir.path(), "service.log").with_clock(move || *clock.lock());

        sink.emit("last of october").unwrap();
        *today.lock() = day(2026, 11, 1);
        sink.emit("first of november").unwrap();

        let october = dir.path().join("2026").join("october").join("2026-10-31_service.0.log");
        let november = dir.path().join("2026").join("november").join("2026-11-01_service.1.log");
        assert_eq!(fs::read_to_string(october).unwrap(), "last of october\n");
        assert_eq!(fs::read_to_string(&november).unwrap(), "first of november\n");
        assert_eq!(sink.state().current_path.as_deref(), Some(november.as_path()));
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::new()
            .with("FOLDERS", "logger", dir.path().to_string_lossy())
            .with("LOGGER", "name", "app.txt")
            .with("LOGGER", "max_bytes", "2048");
        let sink = RotatingFileSink::from_config(&config).unwrap();

        assert_eq!(sink.root(), dir.path());
        assert_eq!(sink.max_bytes, 2048);
        let state = sink.state();
        assert_eq!((state.base_name.as_str(), state.extension.as_str()), ("app", "txt"));
    }
}
