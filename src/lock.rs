//! Advisory whole-file locks.
//!
//! [`FileLock`] wraps the OS lock primitive for an already opened
//! [`File`]. It carries no state of its own, so one instance can be
//! shared by any number of files as long as callers serialize access at
//! a higher layer (see [`crate::handle::FileHandle`]).
//!
//! Platform notes:
//!
//! | target  | primitive                     | shared locks |
//! |---------|-------------------------------|--------------|
//! | unix    | `flock(2)`                    | honored, advisory |
//! | windows | `LockFileEx` over `[0, 2^64)` | honored, but range locks are mandatory: a shared lock also blocks writes through other handles |
//! | other   | none                          | every request fails with [`LockError::Unsupported`] |
//!
//! Locks always cover the whole file. Callers must not rely on partial
//! range semantics.

use std::fmt;
use std::fs::File;
use std::io;

/// Lock kind requested for an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRequest {
    /// Exclusive (write) lock when `true`, shared (read) lock otherwise.
    pub exclusive: bool,
    /// Fail with [`LockError::WouldBlock`] instead of waiting.
    pub nonblocking: bool,
}

impl LockRequest {
    pub const fn exclusive() -> Self {
        Self { exclusive: true, nonblocking: false }
    }

    pub const fn shared() -> Self {
        Self { exclusive: false, nonblocking: false }
    }

    pub const fn nonblocking(mut self, nonblocking: bool) -> Self {
        self.nonblocking = nonblocking;
        self
    }
}

/// OS-level identity of a locked handle (file descriptor on unix, raw
/// handle value on windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Error returned when the OS refuses or fails a lock operation.
#[derive(thiserror::Error, Debug)]
pub enum LockError {
    #[error("lock on handle {handle} is held elsewhere and the request is non-blocking")]
    WouldBlock { handle: HandleId },

    #[error("failed to lock handle {handle}: {source}")]
    Denied {
        handle: HandleId,
        #[source]
        source: io::Error,
    },

    #[error("failed to unlock handle {handle}: {source}")]
    Release {
        handle: HandleId,
        #[source]
        source: io::Error,
    },

    #[error("advisory file locks are not supported on this platform")]
    Unsupported,
}

impl LockError {
    /// Identity of the handle the failed operation targeted, if known.
    pub fn handle(&self) -> Option<HandleId> {
        match self {
            LockError::WouldBlock { handle }
            | LockError::Denied { handle, .. }
            | LockError::Release { handle, .. } => Some(*handle),
            LockError::Unsupported => None,
        }
    }
}

/// Whether a shared request is actually enforced as shared on this target.
pub const fn shared_locks_enforced() -> bool {
    cfg!(any(unix, windows))
}

/// Stateless advisory lock primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLock;

impl FileLock {
    pub const fn new() -> Self {
        FileLock
    }

    /// Lock the whole of `file` as described by `request`.
    ///
    /// Blocks until the lock is granted unless `request.nonblocking` is
    /// set, in which case a conflicting lock yields
    /// [`LockError::WouldBlock`].
    pub fn lock(&self, file: &File, request: LockRequest) -> Result<(), LockError> {
        imp::lock(file, request)
    }

    /// Release any lock held through `file`.
    ///
    /// Unlocking a handle that holds no lock succeeds.
    pub fn unlock(&self, file: &File) -> Result<(), LockError> {
        imp::unlock(file)
    }
}

#[cfg(unix)]
mod imp {
    use super::{HandleId, LockError, LockRequest};
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    fn handle_id(file: &File) -> HandleId {
        HandleId(file.as_raw_fd() as u64)
    }

    fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
        loop {
            // SAFETY: the descriptor is owned by `file` and stays open for the call.
            let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    pub(super) fn lock(file: &File, request: LockRequest) -> Result<(), LockError> {
        let mut operation = if request.exclusive { libc::LOCK_EX } else { libc::LOCK_SH };
        if request.nonblocking {
            operation |= libc::LOCK_NB;
        }

        flock(file, operation).map_err(|source| {
            if source.kind() == io::ErrorKind::WouldBlock {
                LockError::WouldBlock { handle: handle_id(file) }
            } else {
                LockError::Denied { handle: handle_id(file), source }
            }
        })
    }

    pub(super) fn unlock(file: &File) -> Result<(), LockError> {
        // flock(LOCK_UN) on an unlocked descriptor already succeeds.
        flock(file, libc::LOCK_UN)
            .map_err(|source| LockError::Release { handle: handle_id(file), source })
    }
}

#[cfg(windows)]
mod imp {
    use super::{HandleId, LockError, LockRequest};
    use std::fs::File;
    use std::io;
    use std::os::windows::io::AsRawHandle;

    use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, ERROR_NOT_LOCKED};
    use windows_sys::Win32::Storage::FileSystem::{
        LockFileEx, UnlockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
    };
    use windows_sys::Win32::System::IO::OVERLAPPED;

    fn handle_id(file: &File) -> HandleId {
        HandleId(file.as_raw_handle() as usize as u64)
    }

    pub(super) fn lock(file: &File, request: LockRequest) -> Result<(), LockError> {
        let mut flags = 0;
        if request.exclusive {
            flags |= LOCKFILE_EXCLUSIVE_LOCK;
        }
        if request.nonblocking {
            flags |= LOCKFILE_FAIL_IMMEDIATELY;
        }

        // Offset 0 lives in the zeroed OVERLAPPED; the length covers the whole range.
        // SAFETY: OVERLAPPED is a plain C struct for which all-zero is valid.
        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        // SAFETY: the handle is owned by `file` and `overlapped` outlives the call.
        let ok = unsafe {
            LockFileEx(file.as_raw_handle(), flags, 0, u32::MAX, u32::MAX, &mut overlapped)
        };
        if ok != 0 {
            return Ok(());
        }

        let source = io::Error::last_os_error();
        if source.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
            Err(LockError::WouldBlock { handle: handle_id(file) })
        } else {
            Err(LockError::Denied { handle: handle_id(file), source })
        }
    }

    pub(super) fn unlock(file: &File) -> Result<(), LockError> {
        // SAFETY: see `lock`.
        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        let ok = unsafe {
            UnlockFileEx(file.as_raw_handle(), 0, u32::MAX, u32::MAX, &mut overlapped)
        };
        if ok != 0 {
            return Ok(());
        }

        let source = io::Error::last_os_error();
        if source.raw_os_error() == Some(ERROR_NOT_LOCKED as i32) {
            Ok(())
        } else {
            Err(LockError::Release { handle: handle_id(file), source })
        }
    }
}

#[cfg(not(any(unix, windows)))]
mod imp {
    use super::{LockError, LockRequest};
    use std::fs::File;

    pub(super) fn lock(_file: &File, _request: LockRequest) -> Result<(), LockError> {
        Err(LockError::Unsupported)
    }

    pub(super) fn unlock(_file: &File) -> Result<(), LockError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> File {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(dir.path().join("locked.log"))
            .unwrap()
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let file = open(&dir);
        let lock = FileLock::new();

        lock.lock(&file, LockRequest::exclusive()).unwrap();
        lock.unlock(&file).unwrap();
        lock.unlock(&file).unwrap();
    }

    #[test]
    fn test_unlock_without_lock_succeeds() {
        let dir = TempDir::new().unwrap();
        let file = open(&dir);
        FileLock::new().unlock(&file).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_exclusive_conflict_fails_fast_when_nonblocking() {
        let dir = TempDir::new().unwrap();
        let first = open(&dir);
        let second = open(&dir);
        let lock = FileLock::new();

        lock.lock(&first, LockRequest::exclusive()).unwrap();
        let err = lock
            .lock(&second, LockRequest::exclusive().nonblocking(true))
            .unwrap_err();
        assert!(matches!(err, LockError::WouldBlock { .. }));
        assert!(err.handle().is_some());

        lock.unlock(&first).unwrap();
        lock.lock(&second, LockRequest::exclusive().nonblocking(true)).unwrap();
        lock.unlock(&second).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_shared_locks_coexist_but_exclude_writers() {
        let dir = TempDir::new().unwrap();
        let reader_a = open(&dir);
        let reader_b = open(&dir);
        let writer = open(&dir);
        let lock = FileLock::new();

        assert!(shared_locks_enforced());
        lock.lock(&reader_a, LockRequest::shared().nonblocking(true)).unwrap();
        lock.lock(&reader_b, LockRequest::shared().nonblocking(true)).unwrap();

        let err = lock
            .lock(&writer, LockRequest::exclusive().nonblocking(true))
            .unwrap_err();
        assert!(matches!(err, LockError::WouldBlock { .. }));

        lock.unlock(&reader_a).unwrap();
        lock.unlock(&reader_b).unwrap();
        lock.lock(&writer, LockRequest::exclusive().nonblocking(true)).unwrap();
    }
}
