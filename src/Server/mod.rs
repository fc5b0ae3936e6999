mod client;
pub mod forwarding;
mod monitor;
pub mod http;
pub mod ring_buffer;
pub mod transport;
pub mod wire;

pub use client::LogClient;
pub use forwarding::RemoteForwardingChannel;
pub use monitor::LogMonitor;
pub use ring_buffer::{CircularBuffer, ServerRingBuffer};
pub use http::{HttpConnector, HttpLogServer};
pub use transport::{Connector, InProcessConnector, Link, LinkOutcome, LogService};
pub use wire::WireMessage;
