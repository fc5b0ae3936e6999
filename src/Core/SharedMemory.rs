// Shared memory backend abstraction
// Named segments live as files under /dev/shm and are mapped with mmap, so any
// process that knows the name can attach to the same bytes.

use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::PathBuf;
use std::ptr::{self, NonNull};

/// Shared memory backend trait for memory mapping
pub trait SharedMemoryBackend: Send + Sync + Debug {
    /// Get a pointer to the mapped memory region
    fn as_ptr(&self) -> *mut u8;

    /// Get the size of the mapped region in bytes
    fn size(&self) -> usize;

    /// Get the underlying file descriptor
    fn raw_handle(&self) -> RawHandle;

    /// View the region as a byte slice.
    ///
    /// # Safety
    /// The caller must hold whatever lock serializes access to the region;
    /// other processes may write to it concurrently otherwise.
    unsafe fn bytes(&self) -> &[u8] {
        std::slice::from_raw_parts(self.as_ptr(), self.size())
    }

    /// View the region as a mutable byte slice.
    ///
    /// # Safety
    /// Same as [`SharedMemoryBackend::bytes`], and the returned slice must be
    /// the only live view for its lifetime.
    #[allow(clippy::mut_from_ref)]
    unsafe fn bytes_mut(&self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.as_ptr(), self.size())
    }
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy)]
pub enum RawHandle {
    /// Unix file descriptor
    Fd(i32),
    /// Process-private memory with no OS handle
    None,
}

/// Directory holding named segments.
pub fn shm_root() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/dev/shm")
    }
    #[cfg(not(target_os = "linux"))]
    {
        std::env::temp_dir()
    }
}

/// Filesystem path of a named segment or lock.
pub fn shm_path(name: &str) -> PathBuf {
    shm_root().join(name)
}

/// Open the named segment, creating and zero-filling it when it does not
/// exist or is shorter than `size`.
///
/// `mode` is applied to newly created files regardless of the umask so a
/// system-wide segment stays writable by other users.
///
/// Callers that need create-vs-attach to be atomic across processes must
/// hold the segment's named mutex around this call.
pub fn open_or_create_shared_memory(
    name: &str,
    size: usize,
    mode: u32,
) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Ok(Box::new(FileSharedMemory::open_or_create(name, size, mode)?))
}

/// Remove a named segment. Existing mappings stay valid until unmapped.
pub fn unlink_shared_memory(name: &str) -> io::Result<()> {
    match fs::remove_file(shm_path(name)) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// A named, file-backed shared mapping.
#[derive(Debug)]
pub struct FileSharedMemory {
    ptr: NonNull<u8>,
    size: usize,
    fd: i32,
}

// The mapping is plain bytes; synchronisation is the caller's job.
unsafe impl Send for FileSharedMemory {}
unsafe impl Sync for FileSharedMemory {}

impl FileSharedMemory {
    pub fn open_or_create(name: &str, size: usize, mode: u32) -> io::Result<Self> {
        if size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "shared memory size must be greater than zero",
            ));
        }
        let path = shm_path(name);

        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(&path)
        {
            Ok(file) => {
                // create_new honoured the umask; widen to the requested mode.
                file.set_permissions(fs::Permissions::from_mode(mode))?;
                file
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => open_existing(&path)?,
            Err(e) => {
                return Err(io::Error::new(
                    e.kind(),
                    format!("Failed to create shared memory file at {}: {}", path.display(), e),
                ))
            }
        };

        let current = file.metadata()?.len() as usize;
        if current < size {
            // Extending with ftruncate zero-fills the new bytes.
            if unsafe { libc::ftruncate(file.as_raw_fd(), size as libc::off_t) } != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        // Keep the file descriptor alive for the lifetime of the mapping
        let fd = file.into_raw_fd();

        let ptr = unsafe {
            let ptr = libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            );
            if ptr == libc::MAP_FAILED {
                let err = io::Error::last_os_error();
                libc::close(fd);
                return Err(err);
            }
            ptr as *mut u8
        };

        let ptr = match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => {
                unsafe { libc::close(fd) };
                return Err(io::Error::new(io::ErrorKind::Other, "mmap returned null"));
            }
        };

        Ok(Self { ptr, size, fd })
    }
}

fn open_existing(path: &PathBuf) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Failed to open shared memory at {}: {}", path.display(), e),
            )
        })
}

impl Drop for FileSharedMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
            libc::close(self.fd);
        }
    }
}

impl SharedMemoryBackend for FileSharedMemory {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::Fd(self.fd)
    }
}

/// Process-private backend used to exercise codecs without touching the OS.
#[derive(Debug)]
pub struct HeapSharedMemory {
    bytes: Box<[std::cell::UnsafeCell<u8>]>,
}

unsafe impl Send for HeapSharedMemory {}
unsafe impl Sync for HeapSharedMemory {}

impl HeapSharedMemory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: (0..size).map(|_| std::cell::UnsafeCell::new(0)).collect(),
        }
    }
}

impl SharedMemoryBackend for HeapSharedMemory {
    fn as_ptr(&self) -> *mut u8 {
        if self.bytes.is_empty() {
            return NonNull::dangling().as_ptr();
        }
        std::cell::UnsafeCell::raw_get(self.bytes.as_ptr())
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::None
    }
}
