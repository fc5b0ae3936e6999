use crate::error::ChannelError;
use crate::message::Message;

/// An output sink the dispatcher fans messages out to.
///
/// Channels are driven from the dispatcher's single consumer thread, one
/// message at a time, in registration order.
pub trait LogChannel: Send {
    /// Short name used in the dispatcher's own diagnostics.
    fn name(&self) -> &str;

    /// Prepare the channel. A channel returning `false` is never delivered to.
    fn initialize(&mut self) -> bool;

    /// Write one message. An error only affects this channel for this message.
    fn deliver(&mut self, message: &Message) -> Result<(), ChannelError>;
}

impl<C: LogChannel + ?Sized> LogChannel for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn initialize(&mut self) -> bool {
        (**self).initialize()
    }

    fn deliver(&mut self, message: &Message) -> Result<(), ChannelError> {
        (**self).deliver(message)
    }
}
