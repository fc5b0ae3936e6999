use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ChannelError;
use crate::message::Message;
use crate::Dispatch::channel::LogChannel;

/// Channel that keeps every delivered message in memory.
///
/// Clones share the same store, so a test can keep one clone and register
/// the other.
#[derive(Clone)]
pub struct MemoryChannel {
    name: Arc<str>,
    received: Arc<Mutex<Vec<Message>>>,
    accept_init: bool,
}

impl MemoryChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            received: Arc::default(),
            accept_init: true,
        }
    }

    /// A channel whose `initialize` reports failure.
    pub fn failing_init(name: &str) -> Self {
        Self {
            accept_init: false,
            ..Self::new(name)
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.received.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .map(|m| m.text().to_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.lock().is_empty()
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl LogChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) -> bool {
        self.accept_init
    }

    fn deliver(&mut self, message: &Message) -> Result<(), ChannelError> {
        self.received.lock().push(message.clone());
        Ok(())
    }
}
