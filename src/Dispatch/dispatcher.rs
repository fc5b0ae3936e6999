// Asynchronous message dispatcher
//
// Producers push onto an unbounded queue; one consumer thread pops messages
// and hands each to every registered channel in registration order. A slow
// channel slows delivery for everyone but never blocks a producer.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use crossbeam_utils::CachePadded;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::channel::LogChannel;
use super::logger::Logger;
use crate::message::Message;

lazy_static! {
    static ref GLOBAL: Dispatcher = super::DispatcherBuilder::new().build();
}

enum Command {
    Deliver(Message),
    /// End-of-stream marker for the consumer started in the given generation.
    End(u64),
}

type ChannelList = Arc<Mutex<Vec<Box<dyn LogChannel>>>>;

/// Counters updated by producers and the consumer thread.
#[derive(Default)]
struct Counters {
    enqueued: CachePadded<AtomicU64>,
    delivered: CachePadded<AtomicU64>,
    failed: CachePadded<AtomicU64>,
    discarded: CachePadded<AtomicU64>,
}

/// Point-in-time copy of the dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Messages accepted by `enqueue`.
    pub enqueued: u64,
    /// Successful channel deliveries (one message to one channel).
    pub delivered: u64,
    /// Channel deliveries that returned an error or panicked.
    pub failed: u64,
    /// Messages abandoned by a discarding stop.
    pub discarded: u64,
}

/// Fans messages out to registered channels on a background thread.
pub struct Dispatcher {
    queue_tx: Sender<Command>,
    queue_rx: Receiver<Command>,
    channels: ChannelList,
    worker: Mutex<Option<Worker>>,
    generation: AtomicU64,
    drain_on_stop: AtomicBool,
    thread_name: String,
    counters: Arc<Counters>,
}

struct Worker {
    handle: JoinHandle<()>,
    generation: u64,
    cancelled: Arc<AtomicBool>,
    cancel_tx: Sender<()>,
}

impl Dispatcher {
    pub(crate) fn with_config(drain_on_stop: bool, thread_name: String) -> Self {
        let (queue_tx, queue_rx) = unbounded();
        Self {
            queue_tx,
            queue_rx,
            channels: Arc::new(Mutex::new(Vec::new())),
            worker: Mutex::new(None),
            generation: AtomicU64::new(0),
            drain_on_stop: AtomicBool::new(drain_on_stop),
            thread_name,
            counters: Arc::new(Counters::default()),
        }
    }

    /// The process-wide dispatcher, created on first use.
    pub fn global() -> &'static Dispatcher {
        &GLOBAL
    }

    /// Initialize `channel` and, if that succeeds, append it to the fan-out
    /// list. Returns whether the channel was registered.
    pub fn register_channel<C: LogChannel + 'static>(&self, channel: C) -> bool {
        let mut channel: Box<dyn LogChannel> = Box::new(channel);
        let initialized = panic::catch_unwind(AssertUnwindSafe(|| channel.initialize()));
        match initialized {
            Ok(true) => {
                let name = channel.name().to_owned();
                let mut channels = self.channels.lock();
                channels.push(channel);
                debug!(channel = %name, registered = channels.len(), "channel registered");
                true
            }
            Ok(false) => {
                warn!(channel = channel.name(), "channel failed to initialize, discarding");
                false
            }
            Err(_) => {
                error!(channel = channel.name(), "channel panicked during initialize, discarding");
                false
            }
        }
    }

    /// Queue a message for delivery. Never blocks.
    pub fn enqueue(&self, message: Message) {
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        // The dispatcher owns a receiver, so the queue can never be disconnected.
        let _ = self.queue_tx.send(Command::Deliver(message));
    }

    /// Spawn the consumer thread unless one is already running.
    pub fn start(&self) -> std::io::Result<()> {
        let mut worker = self.worker.lock();
        if let Some(current) = worker.as_ref() {
            if !current.handle.is_finished() {
                return Ok(());
            }
        }
        if let Some(dead) = worker.take() {
            warn!("reaping dispatcher worker that exited unexpectedly");
            let _ = dead.handle.join();
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel_tx, cancel_rx) = bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let consumer = Consumer {
            queue: self.queue_rx.clone(),
            cancel: cancel_rx,
            cancelled: Arc::clone(&cancelled),
            generation,
            channels: Arc::clone(&self.channels),
            counters: Arc::clone(&self.counters),
        };

        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || consumer.run())?;

        *worker = Some(Worker {
            handle,
            generation,
            cancelled,
            cancel_tx,
        });
        info!(generation, "dispatcher started");
        Ok(())
    }

    /// Stop the consumer thread. Idempotent.
    ///
    /// In drain mode this returns once every message enqueued before the
    /// call has reached every channel. In discard mode the consumer exits as
    /// soon as it wakes and whatever is still queued is dropped.
    pub fn stop(&self) {
        // Held for the whole shutdown so a concurrent start cannot race the
        // old consumer for queued messages.
        let mut slot = self.worker.lock();
        let Some(worker) = slot.take() else {
            return;
        };

        let drain = self.drain_on_stop();
        if drain {
            let _ = self.queue_tx.send(Command::End(worker.generation));
        } else {
            worker.cancelled.store(true, Ordering::Release);
            let _ = worker.cancel_tx.try_send(());
        }

        if worker.handle.thread().id() == thread::current().id() {
            // Called from inside a channel; the loop exits after this message.
            warn!("dispatcher stopped from its own worker thread");
            return;
        }
        if worker.handle.join().is_err() {
            error!("dispatcher worker panicked");
        }

        if !drain {
            let abandoned = self
                .queue_rx
                .try_iter()
                .filter(|cmd| matches!(cmd, Command::Deliver(_)))
                .count() as u64;
            self.counters.discarded.fetch_add(abandoned, Ordering::Relaxed);
            if abandoned > 0 {
                debug!(abandoned, "discarded queued messages on stop");
            }
        }
        info!(generation = worker.generation, drained = drain, "dispatcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map(|w| !w.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn drain_on_stop(&self) -> bool {
        self.drain_on_stop.load(Ordering::Relaxed)
    }

    /// Choose the shutdown discipline used by the next `stop`.
    pub fn set_drain_on_stop(&self, drain: bool) {
        self.drain_on_stop.store(drain, Ordering::Relaxed);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Messages waiting for the consumer.
    pub fn pending(&self) -> usize {
        self.queue_rx.len()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }

    /// A producer handle that stamps messages with this process's name.
    pub fn logger(&self) -> Logger<'_> {
        Logger::new(self)
    }

    pub(crate) fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_dispatcher(self, f)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Consumer {
    queue: Receiver<Command>,
    cancel: Receiver<()>,
    cancelled: Arc<AtomicBool>,
    generation: u64,
    channels: ChannelList,
    counters: Arc<Counters>,
}

impl Consumer {
    fn run(self) {
        debug!(generation = self.generation, "dispatcher consumer running");
        loop {
            select! {
                recv(self.cancel) -> _ => break,
                recv(self.queue) -> cmd => match cmd {
                    Ok(Command::Deliver(message)) => {
                        if self.cancelled.load(Ordering::Acquire) {
                            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                            break;
                        }
                        self.fan_out(&message);
                    }
                    Ok(Command::End(generation)) if generation == self.generation => break,
                    // left behind by a consumer that died before reading it
                    Ok(Command::End(_)) => {}
                    Err(_) => break,
                },
            }
        }
        debug!(generation = self.generation, "dispatcher consumer exiting");
    }

    fn fan_out(&self, message: &Message) {
        let mut channels = self.channels.lock();
        for channel in channels.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| channel.deliver(message)));
            match outcome {
                Ok(Ok(())) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(channel = channel.name(), error = %e, "channel failed to deliver message");
                }
                Err(_) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(channel = channel.name(), "channel panicked while delivering message");
                }
            }
        }
    }
}
