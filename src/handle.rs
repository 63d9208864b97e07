//! Scoped, locked file handles.
//!
//! [`FileHandle::acquire`] opens a file, takes the advisory lock that
//! matches the open mode and hands back a [`LockedFile`]. Releasing it
//! (explicitly through [`LockedFile::release`] or implicitly on drop)
//! flushes, syncs writable files to disk, unlocks and closes, in that
//! order. Acquire and release both run under the handle's re-entrant
//! mutex, so one thread may hold several [`LockedFile`]s from the same
//! handle while other threads wait.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::error::LogError;
use crate::lock::{FileLock, LockRequest};

/// How a file is opened. Every mode except [`OpenMode::Read`] takes an
/// exclusive lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read an existing file.
    Read,
    /// Create or truncate, then write.
    Write,
    /// Create if missing, always write at the end.
    Append,
    /// Create a file that must not exist yet.
    CreateNew,
    /// Read and write an existing file in place.
    Update,
}

impl OpenMode {
    pub fn is_read_only(self) -> bool {
        matches!(self, OpenMode::Read)
    }

    pub fn lock_request(self) -> LockRequest {
        if self.is_read_only() {
            LockRequest::shared()
        } else {
            LockRequest::exclusive()
        }
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
            OpenMode::CreateNew => options.write(true).create_new(true),
            OpenMode::Update => options.read(true).write(true),
        };
        options
    }
}

/// Factory for [`LockedFile`]s, serialized by a re-entrant mutex.
#[derive(Debug, Default)]
pub struct FileHandle {
    lock: FileLock,
    mutex: ReentrantMutex<()>,
    nonblocking: bool,
}

impl FileHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail acquisitions immediately when another handle holds a
    /// conflicting lock instead of waiting for it.
    pub fn nonblocking(mut self, nonblocking: bool) -> Self {
        self.nonblocking = nonblocking;
        self
    }

    /// Open `path` in `mode` and lock it.
    ///
    /// A file that was opened but could not be locked is closed before
    /// the error is returned.
    pub fn acquire(&self, path: impl AsRef<Path>, mode: OpenMode) -> Result<LockedFile<'_>, LogError> {
        let guard = self.mutex.lock();
        let path = path.as_ref();

        let file = mode
            .options()
            .open(path)
            .map_err(|source| LogError::io("failed to open", path, source))?;

        let request = mode.lock_request().nonblocking(self.nonblocking);
        self.lock
            .lock(&file, request)
            .map_err(|source| LogError::Lock { path: path.to_path_buf(), source })?;

        Ok(LockedFile {
            file: Some(file),
            path: path.to_path_buf(),
            mode,
            lock: self.lock,
            _guard: guard,
        })
    }
}

/// An open, locked file. Implements [`Read`], [`Write`] and [`Seek`].
#[derive(Debug)]
pub struct LockedFile<'a> {
    file: Option<File>,
    path: PathBuf,
    mode: OpenMode,
    lock: FileLock,
    _guard: ReentrantMutexGuard<'a, ()>,
}

impl LockedFile<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Flush, sync (unless read-only), unlock and close.
    pub fn release(mut self) -> Result<(), LogError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), LogError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        let mut synced = file.flush();
        if synced.is_ok() && !self.mode.is_read_only() {
            synced = file.sync_all();
        }
        // The lock goes away even when the sync failed.
        let unlocked = self.lock.unlock(&file);
        drop(file);

        synced.map_err(|source| LogError::io("failed to sync", &self.path, source))?;
        unlocked.map_err(|source| LogError::Lock { path: self.path.clone(), source })
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "locked file already released"))
    }
}

impl Drop for LockedFile<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(path = %self.path.display(), error = %err, "implicit release of locked file failed");
        }
    }
}

impl Write for LockedFile<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl Read for LockedFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut()?.read(buf)
    }
}

impl Seek for LockedFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file_mut()?.seek(pos)
    }
}
