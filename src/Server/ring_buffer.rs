// Fixed-capacity message store hosted by the log server.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::transport::LogService;
use super::wire::WireMessage;
use crate::error::{ServerError, TransportError};

/// Default number of messages the server keeps.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Ring of at most `capacity` items; pushing past capacity evicts the oldest.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    items: Vec<T>,
    /// Next write position once full; also the index of the oldest item.
    head: usize,
    capacity: usize,
}

impl<T> CircularBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, ServerError> {
        if capacity == 0 {
            return Err(ServerError::InvalidCapacity);
        }
        Ok(Self {
            items: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        })
    }

    /// Insert in O(1), returning the evicted item when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.items.len() < self.capacity {
            self.items.push(item);
            return None;
        }
        let evicted = std::mem::replace(&mut self.items[self.head], item);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    /// Items from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.items.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.head = 0;
    }
}

/// Lock-protected ring of received messages, queryable by time.
///
/// Query results are copies in insertion order. Producers are not
/// synchronised with each other, so insertion order need not be
/// chronological; callers wanting time order sort the result.
#[derive(Debug)]
pub struct ServerRingBuffer {
    inner: Mutex<CircularBuffer<WireMessage>>,
}

impl Default for ServerRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerRingBuffer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CircularBuffer {
                items: Vec::with_capacity(DEFAULT_CAPACITY),
                head: 0,
                capacity: DEFAULT_CAPACITY,
            }),
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, ServerError> {
        Ok(Self {
            inner: Mutex::new(CircularBuffer::new(capacity)?),
        })
    }

    pub fn append(&self, message: WireMessage) {
        self.inner.lock().push(message);
    }

    /// All stored messages, or only those strictly newer than `since`.
    pub fn query(&self, since: Option<DateTime<Utc>>) -> Vec<WireMessage> {
        let buffer = self.inner.lock();
        match since {
            None => buffer.iter().cloned().collect(),
            Some(since) => buffer.iter().filter(|m| m.time > since).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

impl LogService for ServerRingBuffer {
    fn write_message(&self, message: WireMessage) -> Result<(), TransportError> {
        self.append(message);
        Ok(())
    }

    fn get_messages(&self, since: Option<DateTime<Utc>>) -> Result<Vec<WireMessage>, TransportError> {
        Ok(self.query(since))
    }
}
