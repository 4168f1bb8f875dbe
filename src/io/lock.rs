//! Cross-process exclusion for sheet writes.
//!
//! The lock is an flock on a sidecar file in the sheets directory. The file
//! itself is permanent: every `tl` process opens the same inode, and only the
//! flock on it comes and goes.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Name of the sidecar file the lock is taken on
pub const LOCK_FILE: &str = ".sheets.lock";

/// How long writers wait for the lock unless told otherwise
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);
const FIRST_BACKOFF: Duration = Duration::from_millis(2);
const MAX_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("cannot open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot lock {path}: {source}")]
    Flock {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("sheets are busy: gave up on {path} after {waited:?}")]
    Busy { path: PathBuf, waited: Duration },
}

/// Exclusive hold on the sheets of one directory.
///
/// Released when dropped, by closing the descriptor.
#[derive(Debug)]
pub struct SheetLock {
    _held: File,
    path: PathBuf,
}

impl SheetLock {
    /// Take the lock if nobody holds it, without waiting.
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>, LockError> {
        let path = dir.join(LOCK_FILE);
        let file = open_lock_file(&path)?;
        match flock_exclusive(&file) {
            Ok(true) => Ok(Some(SheetLock { _held: file, path })),
            Ok(false) => Ok(None),
            Err(source) => Err(LockError::Flock { path, source }),
        }
    }

    /// Take the lock, backing off between attempts for at most `wait`.
    pub fn acquire(dir: &Path, wait: Duration) -> Result<Self, LockError> {
        let started = Instant::now();
        let mut backoff = FIRST_BACKOFF;
        loop {
            if let Some(lock) = Self::try_acquire(dir)? {
                return Ok(lock);
            }
            let waited = started.elapsed();
            if waited >= wait {
                let path = dir.join(LOCK_FILE);
                tracing::warn!(path = %path.display(), ?waited, "sheet lock busy");
                return Err(LockError::Busy { path, waited });
            }
            std::thread::sleep(backoff.min(wait - waited));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|source| LockError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// `Ok(false)` when another descriptor holds the lock.
#[cfg(unix)]
fn flock_exclusive(file: &File) -> std::io::Result<bool> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and open for the whole call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn flock_exclusive(_file: &File) -> std::io::Result<bool> {
    Ok(true)
}
