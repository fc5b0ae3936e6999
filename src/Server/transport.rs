// Transport seams between producers, the server and the monitor.
//
// A `Connector` opens short-lived `Link`s. Every phase that touches the
// network (open, request, close) reports timeouts distinctly so callers can
// abort a link instead of treating a slow peer as fatal.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::wire::WireMessage;
use crate::error::TransportError;

/// The two operations a log server offers.
pub trait LogService: Send + Sync {
    fn write_message(&self, message: WireMessage) -> Result<(), TransportError>;

    /// Every stored message, or only those strictly newer than `since`.
    fn get_messages(&self, since: Option<DateTime<Utc>>) -> Result<Vec<WireMessage>, TransportError>;
}

/// Result of a timed link phase.
#[derive(Debug)]
pub enum LinkOutcome<T> {
    Ok(T),
    TimedOut,
    Failed(TransportError),
}

impl<T> LinkOutcome<T> {
    /// Classify an I/O result, folding both timeout kinds into `TimedOut`.
    pub fn from_io(result: io::Result<T>) -> Self {
        match result {
            Ok(v) => LinkOutcome::Ok(v),
            Err(e) if is_timeout(&e) => LinkOutcome::TimedOut,
            Err(e) => LinkOutcome::Failed(e.into()),
        }
    }

    pub fn into_result(self) -> Result<T, TransportError> {
        match self {
            LinkOutcome::Ok(v) => Ok(v),
            LinkOutcome::TimedOut => Err(TransportError::TimedOut),
            LinkOutcome::Failed(e) => Err(e),
        }
    }
}

pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

/// One open conversation with a server.
pub trait Link: Send {
    fn write_message(&mut self, message: &WireMessage) -> Result<(), TransportError>;

    fn get_messages(&mut self, since: Option<DateTime<Utc>>) -> Result<Vec<WireMessage>, TransportError>;

    /// Orderly shutdown, waiting at most `timeout` for the peer.
    fn close(&mut self, timeout: Duration) -> LinkOutcome<()>;

    /// Tear the link down immediately.
    fn abort(self: Box<Self>);
}

/// Opens links to one endpoint.
pub trait Connector: Send + Sync {
    /// Human-readable endpoint, for diagnostics.
    fn endpoint(&self) -> String;

    fn open(&self, timeout: Duration) -> LinkOutcome<Box<dyn Link>>;
}

/// Connects straight to a service living in this process.
#[derive(Clone)]
pub struct InProcessConnector {
    service: Arc<dyn LogService>,
}

impl InProcessConnector {
    pub fn new(service: Arc<dyn LogService>) -> Self {
        Self { service }
    }
}

impl Connector for InProcessConnector {
    fn endpoint(&self) -> String {
        "in-process".to_owned()
    }

    fn open(&self, _timeout: Duration) -> LinkOutcome<Box<dyn Link>> {
        LinkOutcome::Ok(Box::new(InProcessLink {
            service: Some(Arc::clone(&self.service)),
        }))
    }
}

struct InProcessLink {
    service: Option<Arc<dyn LogService>>,
}

impl InProcessLink {
    fn service(&self) -> Result<&Arc<dyn LogService>, TransportError> {
        self.service.as_ref().ok_or(TransportError::Disconnected)
    }
}

impl Link for InProcessLink {
    fn write_message(&mut self, message: &WireMessage) -> Result<(), TransportError> {
        self.service()?.write_message(message.clone())
    }

    fn get_messages(&mut self, since: Option<DateTime<Utc>>) -> Result<Vec<WireMessage>, TransportError> {
        self.service()?.get_messages(since)
    }

    fn close(&mut self, _timeout: Duration) -> LinkOutcome<()> {
        self.service = None;
        LinkOutcome::Ok(())
    }

    fn abort(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_classified() {
        let timed_out: LinkOutcome<()> = LinkOutcome::from_io(Err(io::ErrorKind::TimedOut.into()));
        assert!(matches!(timed_out, LinkOutcome::TimedOut));
        let would_block: LinkOutcome<()> = LinkOutcome::from_io(Err(io::ErrorKind::WouldBlock.into()));
        assert!(matches!(would_block, LinkOutcome::TimedOut));
        let refused: LinkOutcome<()> =
            LinkOutcome::from_io(Err(io::ErrorKind::ConnectionRefused.into()));
        assert!(matches!(refused, LinkOutcome::Failed(TransportError::Io(_))));
    }

    #[test]
    fn closed_in_process_link_refuses_requests() {
        let service: Arc<dyn LogService> = Arc::new(crate::Server::ServerRingBuffer::new());
        let LinkOutcome::Ok(mut link) = InProcessConnector::new(service).open(Duration::ZERO) else {
            panic!("in-process open cannot fail");
        };
        assert!(link.get_messages(None).unwrap().is_empty());
        assert!(matches!(link.close(Duration::ZERO), LinkOutcome::Ok(())));
        assert!(matches!(link.get_messages(None), Err(TransportError::Disconnected)));
    }
}
