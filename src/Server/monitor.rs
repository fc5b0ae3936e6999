// Polling view of a remote server's ring.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::client::LogClient;
use super::wire::WireMessage;
use crate::error::TransportError;

/// Repeatedly fetches messages newer than the newest one already seen.
///
/// The server returns insertion order; each batch is sorted by time here
/// before the watermark advances.
pub struct LogMonitor {
    client: LogClient,
    watermark: Option<DateTime<Utc>>,
    connected: bool,
}

impl LogMonitor {
    pub fn new(client: LogClient) -> Self {
        Self {
            client,
            watermark: None,
            connected: false,
        }
    }

    /// Fetch the next batch, oldest first.
    pub fn poll(&mut self) -> Result<Vec<WireMessage>, TransportError> {
        match self.client.get_messages(self.watermark) {
            Ok(mut batch) => {
                self.connected = true;
                batch.sort_by_key(|m| m.time);
                if let Some(newest) = batch.last() {
                    self.watermark = Some(newest.time);
                }
                Ok(batch)
            }
            Err(e) => {
                if self.connected {
                    debug!(endpoint = %self.client.endpoint(), error = %e, "monitor lost connection");
                }
                self.connected = false;
                Err(e)
            }
        }
    }

    /// Whether the last poll reached the server.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark
    }

    /// Forget the watermark so the next poll returns everything stored.
    pub fn reset(&mut self) {
        self.watermark = None;
    }
}

impl std::fmt::Debug for LogMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_log_monitor(self, f)
    }
}
