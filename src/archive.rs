//! Monthly archival of finished log folders.
//!
//! A sweep walks `<root>/<year>/<month>` and turns every month folder
//! other than the current one into `<root>/<year>/<month>.zip`, holding
//! the folder's `*.log` files as flat entries, then removes the folder.
//! Folders without log files are left alone. A folder whose archive
//! cannot be written is kept and the sweep moves on to the next one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Datelike, Local, NaiveDate};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::Config;
use crate::error::LogError;
use crate::file_sink::month_name;
use crate::handle::{FileHandle, OpenMode};

/// Outcome of one sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Archives written (or extended), in sweep order.
    pub archived: Vec<PathBuf>,
    /// Folders that could not be archived and were kept.
    pub failed: Vec<(PathBuf, LogError)>,
}

/// `*.log` files directly inside `folder`, in name order.
///
/// The sequence is computed lazily from the file system; call again to
/// start over.
pub fn log_files(folder: &Path) -> impl Iterator<Item = PathBuf> {
    let escaped = glob::Pattern::escape(&folder.to_string_lossy());
    let pattern = Path::new(&escaped).join("*.log");
    glob::glob(&pattern.to_string_lossy())
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
}

fn month_number(name: &str) -> Option<u32> {
    (1..=12).find(|&month| NaiveDate::from_ymd_opt(2000, month, 1).map(month_name).as_deref() == Some(name))
}

/// Month folders under `root` that belong to any month but `today`'s.
///
/// Only a failure to list `root` itself is returned as an error. A year
/// folder that cannot be listed is recorded in `failed` and skipped.
fn stale_month_folders(
    root: &Path,
    today: NaiveDate,
    failed: &mut Vec<(PathBuf, LogError)>,
) -> Result<Vec<PathBuf>, LogError> {
    let scan_error = |dir: &Path, source: io::Error| LogError::io("failed to scan", dir, source);

    let mut folders = Vec::new();
    for year_entry in fs::read_dir(root).map_err(|source| scan_error(root, source))? {
        let year_dir = match year_entry {
            Ok(entry) => entry.path(),
            Err(source) => {
                failed.push((root.to_path_buf(), scan_error(root, source)));
                continue;
            }
        };
        let Some(year) = year_dir
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse::<i32>().ok())
        else {
            continue;
        };
        if !year_dir.is_dir() {
            continue;
        }

        let month_entries = match fs::read_dir(&year_dir) {
            Ok(entries) => entries,
            Err(source) => {
                tracing::warn!(folder = %year_dir.display(), error = %source, "log year folder skipped");
                let err = scan_error(&year_dir, source);
                failed.push((year_dir, err));
                continue;
            }
        };
        for month_entry in month_entries {
            let month_dir = match month_entry {
                Ok(entry) => entry.path(),
                Err(source) => {
                    failed.push((year_dir.clone(), scan_error(&year_dir, source)));
                    continue;
                }
            };
            let Some(month) = month_dir
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(month_number)
            else {
                continue;
            };
            if !month_dir.is_dir() || (year == today.year() && month == today.month()) {
                continue;
            }
            folders.push(month_dir);
        }
    }

    folders.sort();
    Ok(folders)
}

fn discard_partial(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(path = %partial.display(), error = %err, "failed to remove partial archive"),
    }
}

/// Archives stale month folders under a log root.
#[derive(Debug)]
pub struct Sweeper {
    root: PathBuf,
    handle: FileHandle,
    done: AtomicBool,
}

impl Sweeper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), handle: FileHandle::new(), done: AtomicBool::new(false) }
    }

    /// Sweeper over `FOLDERS.logger`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.log_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has_run(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Sweep for the current local date, only the first time this is called.
    pub fn run_once(&self) -> Option<SweepReport> {
        if self.done.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.sweep(Local::now().date_naive()))
    }

    /// Archive every month folder except the one of `today`.
    ///
    /// Never fails as a whole: per-folder errors are collected in the report.
    pub fn sweep(&self, today: NaiveDate) -> SweepReport {
        let mut report = SweepReport::default();
        if !self.root.is_dir() {
            return report;
        }

        let folders = match stale_month_folders(&self.root, today, &mut report.failed) {
            Ok(folders) => folders,
            Err(err) => {
                tracing::warn!(root = %self.root.display(), error = %err, "log archival scan failed");
                report.failed.push((self.root.clone(), err));
                return report;
            }
        };

        for folder in folders {
            if log_files(&folder).next().is_none() {
                continue;
            }
            match self.archive_folder(&folder) {
                Ok(archive) => {
                    tracing::debug!(archive = %archive.display(), "archived log folder");
                    report.archived.push(archive);
                }
                Err(err) => {
                    tracing::warn!(folder = %folder.display(), error = %err, "log folder kept, archival failed");
                    report.failed.push((folder, err));
                }
            }
        }

        report
    }

    fn archive_folder(&self, folder: &Path) -> Result<PathBuf, LogError> {
        let archive = folder.with_extension("zip");

        if archive.exists() {
            self.write_archive(&archive, OpenMode::Update, folder)?;
        } else {
            // Built aside so a failed sweep never leaves a truncated archive behind.
            let partial = folder.with_extension("zip.partial");
            let written = self.write_archive(&partial, OpenMode::Write, folder).and_then(|()| {
                fs::rename(&partial, &archive)
                    .map_err(|source| LogError::io("failed to move archive into place", &archive, source))
            });
            if let Err(err) = written {
                discard_partial(&partial);
                return Err(err);
            }
        }

        fs::remove_dir_all(folder).map_err(|source| LogError::io("failed to remove", folder, source))?;
        Ok(archive)
    }

    fn write_archive(&self, archive: &Path, mode: OpenMode, folder: &Path) -> Result<(), LogError> {
        let zip_error = |source: zip::result::ZipError| LogError::Archive { path: archive.to_path_buf(), source };

        let mut target = self.handle.acquire(archive, mode)?;
        {
            let mut writer = if mode == OpenMode::Update {
                ZipWriter::new_append(&mut target).map_err(zip_error)?
            } else {
                ZipWriter::new(&mut target)
            };

            for path in log_files(folder) {
                let Some(name) = path.file_name().map(|name| name.to_string_lossy().into_owned()) else {
                    continue;
                };
                let mut source = self.handle.acquire(&path, OpenMode::Read)?;
                let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
                writer.start_file(name, options).map_err(zip_error)?;
                io::copy(&mut source, &mut writer)
                    .map_err(|source| LogError::io("failed to archive", &path, source))?;
                source.release()?;
            }

            writer.finish().map_err(zip_error)?;
        }
        target.release()
    }
}
