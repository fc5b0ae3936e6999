// Per-operation client: open a link, run one request, close it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::transport::{Connector, Link, LinkOutcome};
use super::wire::WireMessage;
use crate::error::TransportError;

/// Lower bound applied to every configured timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Talks to one log server through short-lived links.
pub struct LogClient {
    connector: Box<dyn Connector>,
    timeout: Duration,
}

impl LogClient {
    pub fn new(connector: Box<dyn Connector>, timeout: Duration) -> Self {
        Self {
            connector,
            timeout: timeout.max(MIN_TIMEOUT),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    pub fn write_message(&self, message: &WireMessage) -> Result<(), TransportError> {
        self.with_link(|link| link.write_message(message))
    }

    pub fn get_messages(&self, since: Option<DateTime<Utc>>) -> Result<Vec<WireMessage>, TransportError> {
        self.with_link(|link| link.get_messages(since))
    }

    /// Run `op` on a fresh link.
    ///
    /// A timeout while opening fails the call. A timeout while closing
    /// aborts the link but keeps the result of `op`, which the server has
    /// already acted on. Any other close failure aborts the link and is
    /// returned.
    fn with_link<T>(
        &self,
        op: impl FnOnce(&mut dyn Link) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut link = self.connector.open(self.timeout).into_result()?;

        let result = match op(link.as_mut()) {
            Ok(v) => v,
            Err(e) => {
                link.abort();
                return Err(e);
            }
        };

        match link.close(self.timeout) {
            LinkOutcome::Ok(()) => {}
            LinkOutcome::TimedOut => {
                debug!(endpoint = %self.connector.endpoint(), "close timed out, aborting link");
                link.abort();
            }
            LinkOutcome::Failed(e) => {
                warn!(endpoint = %self.connector.endpoint(), error = %e, "close failed, aborting link");
                link.abort();
                return Err(e);
            }
        }
        Ok(result)
    }
}

impl std::fmt::Debug for LogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_log_client(self, f)
    }
}
