use super::channel::LogChannel;
use super::dispatcher::Dispatcher;
use tracing::warn;

pub struct DispatcherBuilder {
    drain_on_stop: bool,
    thread_name: String,
    channels: Vec<Box<dyn LogChannel>>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            drain_on_stop: true, // deliver everything queued before stop returns
            thread_name: "dmxp-dispatch".to_owned(),
            channels: Vec::new(),
        }
    }
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` drains the queue on stop, `false` abandons queued messages.
    pub fn with_drain_on_stop(mut self, drain: bool) -> Self {
        self.drain_on_stop = drain;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Register a channel at build time. Channels that fail to initialize
    /// are logged and dropped.
    pub fn with_channel<C: LogChannel + 'static>(mut self, channel: C) -> Self {
        self.channels.push(Box::new(channel));
        self
    }

    pub fn build(self) -> Dispatcher {
        let dispatcher = Dispatcher::with_config(self.drain_on_stop, self.thread_name);
        for channel in self.channels {
            let name = channel.name().to_owned();
            if !dispatcher.register_channel(channel) {
                warn!(channel = %name, "builder channel was not registered");
            }
        }
        dispatcher
    }

    /// Build and start the consumer thread.
    pub fn build_started(self) -> std::io::Result<Dispatcher> {
        let dispatcher = self.build();
        dispatcher.start()?;
        Ok(dispatcher)
    }
}
