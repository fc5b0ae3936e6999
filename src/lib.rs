// Module naming follows project convention (Core = process-shared primitives)
#[allow(non_snake_case)]
pub mod Core {
    pub mod SharedMemory;
    pub use SharedMemory::{
        open_or_create_shared_memory, unlink_shared_memory, FileSharedMemory, HeapSharedMemory,
        RawHandle, SharedMemoryBackend,
    };
    pub mod exit;
    pub use exit::{close_all, install_exit_hook, ExitCleanup};
    pub mod lock;
    pub use lock::{NamedMutex, NamedMutexGuard};
    pub mod process;
    pub use process::current_process_name;
}
#[allow(non_snake_case)]
pub mod SharedLog;
#[allow(non_snake_case)]
pub mod Dispatch;
#[allow(non_snake_case)]
pub mod Server;
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

pub mod error;
pub mod ffi;
pub mod message;

pub use error::{ChannelError, ServerError, SharedLogError, TransportError};
pub use message::{LogLevel, Message, DEFAULT_METHOD_NAME};
