// Channel that forwards every message to a remote log server.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tracing::{info, warn};

use super::client::LogClient;
use super::http::{HttpConnector, DEFAULT_PORT};
use super::transport::Connector;
use super::wire::WireMessage;
use crate::error::{ChannelError, TransportError};
use crate::message::Message;
use crate::Dispatch::{ChannelSettings, LogChannel};

/// Setting holding the server address (`ip` or `ip:port`).
pub const SERVER_ADDRESS_KEY: &str = "ServerAddress";
/// Setting holding the per-phase timeout in milliseconds.
pub const SERVER_TIMEOUT_KEY: &str = "ServerTimeout";

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 20;

type ConnectorFactory = Box<dyn Fn(SocketAddr) -> Box<dyn Connector> + Send>;

/// Parse `ip` or `ip:port`, defaulting the port.
pub fn parse_server_address(raw: &str) -> Result<SocketAddr, TransportError> {
    let raw = raw.trim();
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let bare = raw.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DEFAULT_PORT))
        .map_err(|_| TransportError::InvalidAddress(raw.to_owned()))
}

/// Sends each delivered message to a log server over its own short link.
pub struct RemoteForwardingChannel {
    settings: ChannelSettings,
    factory: ConnectorFactory,
    client: Option<LogClient>,
}

impl RemoteForwardingChannel {
    /// Forward over HTTP.
    pub fn new(settings: ChannelSettings) -> Self {
        Self::with_connector_factory(settings, |addr| {
            Box::new(HttpConnector::new(addr)) as Box<dyn Connector>
        })
    }

    /// Forward through connectors built by `factory` from the configured
    /// address.
    pub fn with_connector_factory<F>(settings: ChannelSettings, factory: F) -> Self
    where
        F: Fn(SocketAddr) -> Box<dyn Connector> + Send + 'static,
    {
        Self {
            settings,
            factory: Box::new(factory),
            client: None,
        }
    }

    pub fn endpoint(&self) -> Option<String> {
        self.client.as_ref().map(LogClient::endpoint)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.client.as_ref().map(LogClient::timeout)
    }
}

impl std::fmt::Debug for RemoteForwardingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_remote_channel(self, f)
    }
}

impl LogChannel for RemoteForwardingChannel {
    fn name(&self) -> &str {
        "remote"
    }

    fn initialize(&mut self) -> bool {
        let raw = self
            .settings
            .get(SERVER_ADDRESS_KEY)
            .unwrap_or(DEFAULT_SERVER_ADDRESS)
            .to_owned();
        let addr = match parse_server_address(&raw) {
            Ok(addr) => addr,
            Err(e) => {
                warn!(error = %e, "remote channel not configured");
                return false;
            }
        };
        let timeout = Duration::from_millis(self.settings.try_get(SERVER_TIMEOUT_KEY, DEFAULT_TIMEOUT_MS));
        let client = LogClient::new((self.factory)(addr), timeout);
        info!(endpoint = %client.endpoint(), timeout_ms = client.timeout().as_millis() as u64, "remote channel ready");
        self.client = Some(client);
        true
    }

    fn deliver(&mut self, message: &Message) -> Result<(), ChannelError> {
        let client = self.client.as_ref().ok_or(ChannelError::NotInitialized)?;
        client.write_message(&WireMessage::from(message))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn address_forms() {
        assert_eq!(
            parse_server_address("10.0.0.5").unwrap(),
            SocketAddr::new(Ipv4Addr::new(10, 0, 0, 5).into(), DEFAULT_PORT)
        );
        assert_eq!(parse_server_address(" 10.0.0.5:9000 ").unwrap().port(), 9000);
        assert_eq!(parse_server_address("[::1]").unwrap().port(), DEFAULT_PORT);
        assert!(matches!(
            parse_server_address("not-an-ip"),
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[test]
    fn bad_address_fails_initialize() {
        let mut channel = RemoteForwardingChannel::new(ChannelSettings::new().with(SERVER_ADDRESS_KEY, "nowhere"));
        assert!(!channel.initialize());
        let msg = Message::new(crate::message::LogLevel::Info, "p", "m", "t");
        assert!(matches!(channel.deliver(&msg), Err(ChannelError::NotInitialized)));
    }

    #[test]
    fn defaults_apply_without_settings() {
        let mut channel = RemoteForwardingChannel::new(ChannelSettings::new());
        assert!(channel.initialize());
        assert_eq!(channel.endpoint().as_deref(), Some("127.0.0.1:8521"));
        assert_eq!(channel.timeout(), Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)));
    }
}
