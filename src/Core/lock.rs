// System-wide named mutex
// An exclusive flock on a lock file next to the segment. The kernel drops the
// lock when the holder's descriptor closes, including when the process dies.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use super::SharedMemory::shm_path;

/// Mutual exclusion shared by every process that opens the same name.
///
/// Each `NamedMutex` owns its own open file description, so two instances in
/// the same process exclude each other as well. A single instance is not
/// re-entrant: callers must serialise their own threads before locking.
#[derive(Debug)]
pub struct NamedMutex {
    name: String,
    file: File,
}

/// Held lock; released on drop.
#[derive(Debug)]
pub struct NamedMutexGuard<'a> {
    mutex: &'a NamedMutex,
}

impl NamedMutex {
    /// Create the lock file if needed and open it.
    pub fn open(name: &str, mode: u32) -> io::Result<Self> {
        let path = shm_path(name);
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(&path)
        {
            Ok(file) => {
                file.set_permissions(fs::Permissions::from_mode(mode))?;
                file
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                OpenOptions::new().read(true).write(true).open(&path)?
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            name: name.to_owned(),
            file,
        })
    }

    /// Block until the lock is acquired.
    pub fn lock(&self) -> io::Result<NamedMutexGuard<'_>> {
        loop {
            let rc = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_EX) };
            if rc == 0 {
                return Ok(NamedMutexGuard { mutex: self });
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    /// Acquire the lock only if nobody holds it.
    pub fn try_lock(&self) -> io::Result<Option<NamedMutexGuard<'_>>> {
        let rc = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc == 0 {
            return Ok(Some(NamedMutexGuard { mutex: self }));
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock {
            Ok(None)
        } else {
            Err(err)
        }
    }

    #[cfg(test)]
    pub(crate) fn from_file(name: &str, file: File) -> Self {
        Self {
            name: name.to_owned(),
            file,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedMutexGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            libc::flock(self.mutex.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}
