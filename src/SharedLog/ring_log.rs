// Cross-process diagnostic ring log
//
// Every header and slot access happens under one named mutex shared by all
// attached processes. Slots are reused unconditionally: message id 32
// overwrites the slot that held id 0 whether or not anyone read it.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::layout::{
    decode_slot, encode_slot, slot_index, slot_range, SegmentHeader, SEGMENT_SIZE, SLOT_COUNT,
};
use crate::error::SharedLogError;
use crate::Core::exit::{self, ExitCleanup};
use crate::Core::lock::NamedMutex;
use crate::Core::SharedMemory::{open_or_create_shared_memory, unlink_shared_memory, SharedMemoryBackend};

/// Fixed token naming the segment.
pub const SEGMENT_TOKEN: &str = "InternalLogSegment";
/// Fixed token naming the mutex guarding the segment.
pub const MUTEX_TOKEN: &str = "InternalLogMutex";
/// Prefix that places both names in the system-wide namespace.
pub const GLOBAL_PREFIX: &str = "Global.";

/// Visibility of the segment and its mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Shared by the processes of the current user.
    #[default]
    Local,
    /// Shared by every process on the machine.
    Global,
}

impl Scope {
    fn mode(self) -> u32 {
        match self {
            Scope::Local => 0o600,
            Scope::Global => 0o666,
        }
    }

    /// Segment and mutex names for this scope.
    pub fn names(self, namespace: &str) -> (String, String) {
        match self {
            Scope::Local => {
                let uid = unsafe { libc::getuid() };
                (
                    format!("{namespace}{SEGMENT_TOKEN}.{uid}"),
                    format!("{namespace}{MUTEX_TOKEN}.{uid}"),
                )
            }
            Scope::Global => (
                format!("{GLOBAL_PREFIX}{namespace}{SEGMENT_TOKEN}"),
                format!("{GLOBAL_PREFIX}{namespace}{MUTEX_TOKEN}"),
            ),
        }
    }
}

/// A message read back from the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Position in this reader's view of the message sequence.
    pub sequence: u64,
    pub time: DateTime<Utc>,
    pub process: String,
    pub text: String,
}

/// A per-process handle on the shared diagnostic ring.
///
/// The handle is `Sync`; threads sharing one handle are serialised by an
/// in-process lock before the named mutex is taken.
pub struct SharedRingLog {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    scope: Scope,
    segment_name: String,
    mutex_name: String,
    process: String,
    state: Mutex<Option<Attached>>,
}

struct Attached {
    segment: Box<dyn SharedMemoryBackend>,
    lock: NamedMutex,
    /// 64-bit extension of the header's 16-bit id as of this handle's last read.
    seen: u64,
}

impl SharedRingLog {
    /// Attach to the default segment for `scope`, creating it if needed.
    pub fn open(scope: Scope) -> Result<Self, SharedLogError> {
        super::SharedLogBuilder::new().with_scope(scope).open()
    }

    pub(crate) fn attach(scope: Scope, namespace: &str, process: String) -> Result<Self, SharedLogError> {
        let (segment_name, mutex_name) = scope.names(namespace);
        let mode = scope.mode();

        let lock = NamedMutex::open(&mutex_name, mode).map_err(SharedLogError::io("mutex creation"))?;

        let segment = {
            let _guard = lock.lock().map_err(SharedLogError::io("mutex acquisition"))?;

            // Created under the mutex so a concurrent last close cannot
            // unlink the file between our open and our increment.
            let segment = open_or_create_shared_memory(&segment_name, SEGMENT_SIZE, mode)
                .map_err(SharedLogError::io("segment creation"))?;
            if segment.size() < SEGMENT_SIZE {
                return Err(SharedLogError::SegmentTooSmall {
                    expected: SEGMENT_SIZE,
                    actual: segment.size(),
                });
            }

            let bytes = unsafe { segment.bytes_mut() };
            let mut header = SegmentHeader::read(bytes);
            header.instance_count = header.instance_count.saturating_add(1);
            header.write(bytes);
            debug!(
                segment = %segment_name,
                instances = header.instance_count,
                "attached to diagnostic segment"
            );
            segment
        };

        let inner = Arc::new(Inner {
            scope,
            segment_name,
            mutex_name,
            process,
            state: Mutex::new(Some(Attached {
                segment,
                lock,
                seen: 0,
            })),
        });

        let cleanup: Arc<dyn ExitCleanup> = inner.clone();
        exit::register(&cleanup);

        Ok(Self { inner })
    }

    /// Record `text`, silently truncated to fit one slot.
    pub fn write(&self, text: &str) -> Result<(), SharedLogError> {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let mut state = self.inner.state.lock();
        let attached = state.as_mut().ok_or(SharedLogError::Closed)?;

        let _guard = attached
            .lock
            .lock()
            .map_err(SharedLogError::io("mutex acquisition"))?;
        let bytes = unsafe { attached.segment.bytes_mut() };

        let mut header = SegmentHeader::read(bytes);
        let id = header.next_message_id;
        let slot = slot_range(slot_index(id as i64));
        encode_slot(&mut bytes[slot], timestamp, &self.inner.process, text);
        header.next_message_id = id.wrapping_add(1);
        header.write(bytes);
        Ok(())
    }

    /// Every message written since this handle last read, newest first.
    ///
    /// At most [`SLOT_COUNT`] records come back; anything older has already
    /// been overwritten.
    pub fn read_new(&self) -> Result<Vec<DiagnosticRecord>, SharedLogError> {
        let mut state = self.inner.state.lock();
        let attached = state.as_mut().ok_or(SharedLogError::Closed)?;

        let _guard = attached
            .lock
            .lock()
            .map_err(SharedLogError::io("mutex acquisition"))?;
        let bytes = unsafe { attached.segment.bytes() };

        let header = SegmentHeader::read(bytes);
        let written = (header.next_message_id as u16).wrapping_sub(attached.seen as u16) as u64;
        if written == 0 {
            return Ok(Vec::new());
        }
        attached.seen += written;

        let newest = attached.seen - 1;
        let count = written.min(SLOT_COUNT as u64);
        let records = (0..count)
            .filter_map(|back| {
                let sequence = newest - back;
                let slot = &bytes[slot_range(slot_index(sequence as i64))];
                decode_slot(slot).map(|rec| DiagnosticRecord {
                    sequence,
                    time: Utc.timestamp_nanos(rec.timestamp),
                    process: rec.process,
                    text: rec.text,
                })
            })
            .collect();
        Ok(records)
    }

    /// Number of open handles across all processes.
    pub fn instance_count(&self) -> Result<i16, SharedLogError> {
        self.read_header().map(|h| h.instance_count)
    }

    /// Raw 16-bit message counter; wraps after 32767.
    pub fn total_message_count(&self) -> Result<i16, SharedLogError> {
        self.read_header().map(|h| h.next_message_id)
    }

    fn read_header(&self) -> Result<SegmentHeader, SharedLogError> {
        let state = self.inner.state.lock();
        let attached = state.as_ref().ok_or(SharedLogError::Closed)?;
        let _guard = attached
            .lock
            .lock()
            .map_err(SharedLogError::io("mutex acquisition"))?;
        Ok(SegmentHeader::read(unsafe { attached.segment.bytes() }))
    }

    /// Detach. The last handle to close removes the segment. Idempotent.
    pub fn close(&self) -> Result<(), SharedLogError> {
        self.inner.close()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().is_some()
    }

    pub fn scope(&self) -> Scope {
        self.inner.scope
    }

    pub fn process_name(&self) -> &str {
        &self.inner.process
    }

    pub fn segment_name(&self) -> &str {
        &self.inner.segment_name
    }

    pub fn mutex_name(&self) -> &str {
        &self.inner.mutex_name
    }
}

impl Inner {
    fn close(&self) -> Result<(), SharedLogError> {
        let mut state = self.state.lock();
        let Some(attached) = state.as_ref() else {
            return Ok(());
        };

        let remaining = {
            let _guard = attached
                .lock
                .lock()
                .map_err(SharedLogError::io("mutex acquisition"))?;
            let bytes = unsafe { attached.segment.bytes_mut() };
            let mut header = SegmentHeader::read(bytes);
            header.instance_count = header.instance_count.saturating_sub(1).max(0);
            header.write(bytes);

            if header.instance_count == 0 {
                // Still under the mutex: a concurrent open waits and then
                // creates a fresh segment instead of reviving this one.
                if let Err(e) = unlink_shared_memory(&self.segment_name) {
                    warn!(segment = %self.segment_name, error = %e, "failed to remove diagnostic segment");
                } else {
                    info!(segment = %self.segment_name, "last handle closed, diagnostic segment removed");
                }
            }
            header.instance_count
        };

        // Detach only after the count is released.
        let detached = state.take();
        drop(state);
        debug!(segment = %self.segment_name, instances = remaining, "detached from diagnostic segment");
        // Unmaps and closes the lock descriptor.
        drop(detached);
        Ok(())
    }
}

impl std::fmt::Debug for SharedRingLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_shared_ring_log(self, f)
    }
}

impl ExitCleanup for Inner {
    fn cleanup(&self) {
        if let Err(e) = self.close() {
            warn!(segment = %self.segment_name, error = %e, "failed to close diagnostic log on exit");
        }
    }
}

impl Drop for SharedRingLog {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            warn!(segment = %self.inner.segment_name, error = %e, "failed to close diagnostic log");
        }
    }
}
