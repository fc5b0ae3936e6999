mod builder;
pub mod channel;
pub mod channels;
mod dispatcher;
mod logger;
pub mod settings;

pub use builder::DispatcherBuilder;
pub use channel::LogChannel;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use logger::Logger;
pub use settings::ChannelSettings;
