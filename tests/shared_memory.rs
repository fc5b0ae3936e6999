// Shared memory backend tests for Linux
// Run with: cargo test --test shared_memory -- --nocapture

#[cfg(target_os = "linux")]
mod linux_tests {
    use dmxp_logrelay::Core::SharedMemory::shm_path;
    use dmxp_logrelay::Core::{
        open_or_create_shared_memory, unlink_shared_memory, HeapSharedMemory, RawHandle,
        SharedMemoryBackend,
    };

    fn unique(name: &str) -> String {
        format!("dmxp_shm_test_{}_{}", std::process::id(), name)
    }

    #[test]
    fn test_create_shared_memory() {
        let name = unique("create");
        let size = 4096;
        let shm = open_or_create_shared_memory(&name, size, 0o600).unwrap();

        assert_eq!(shm.size(), size);
        assert!(!shm.as_ptr().is_null());
        assert!(matches!(shm.raw_handle(), RawHandle::Fd(fd) if fd >= 0));
        assert!(shm_path(&name).exists());

        unsafe {
            let bytes = shm.bytes_mut();
            bytes[0] = 0x42;
            assert_eq!(bytes[0], 0x42);
        }
        unlink_shared_memory(&name).unwrap();
    }

    #[test]
    fn test_new_segment_is_zeroed() {
        let name = unique("zeroed");
        let shm = open_or_create_shared_memory(&name, 8192, 0o600).unwrap();
        assert!(unsafe { shm.bytes() }.iter().all(|&b| b == 0));
        unlink_shared_memory(&name).unwrap();
    }

    #[test]
    fn test_two_mappings_share_bytes() {
        let name = unique("shared");
        let a = open_or_create_shared_memory(&name, 1024, 0o600).unwrap();
        let b = open_or_create_shared_memory(&name, 1024, 0o600).unwrap();

        unsafe {
            a.bytes_mut()[100..104].copy_from_slice(b"dmxp");
            assert_eq!(&b.bytes()[100..104], b"dmxp");
        }
        unlink_shared_memory(&name).unwrap();
    }

    #[test]
    fn test_unlink_keeps_existing_mapping() {
        let name = unique("unlink");
        let shm = open_or_create_shared_memory(&name, 1024, 0o600).unwrap();
        unsafe { shm.bytes_mut()[0] = 7 };

        unlink_shared_memory(&name).unwrap();
        assert!(!shm_path(&name).exists());
        assert_eq!(unsafe { shm.bytes() }[0], 7);

        // Removing twice is not an error.
        unlink_shared_memory(&name).unwrap();
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(open_or_create_shared_memory(&unique("zero"), 0, 0o600).is_err());
    }

    #[test]
    fn test_heap_backend() {
        let heap = HeapSharedMemory::new(64);
        assert_eq!(heap.size(), 64);
        assert!(matches!(heap.raw_handle(), RawHandle::None));
        unsafe {
            heap.bytes_mut()[63] = 9;
            assert_eq!(heap.bytes()[63], 9);
        }
    }
}
