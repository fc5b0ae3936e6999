// Error types for every component of the crate.

use std::io;
use thiserror::Error;

/// Failures of the cross-process diagnostic log.
#[derive(Debug, Error)]
pub enum SharedLogError {
    /// Creating or mapping the segment, or taking the named mutex, failed.
    #[error("shared log {what} failed: {source}")]
    Io {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("shared segment too small: expected at least {expected} bytes, got {actual}")]
    SegmentTooSmall { expected: usize, actual: usize },

    #[error("shared log handle is closed")]
    Closed,
}

impl SharedLogError {
    pub(crate) fn io(what: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| SharedLogError::Io { what, source }
    }
}

/// Failures of a remote transport link.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("operation timed out")]
    TimedOut,

    #[error("server rejected request: {0}")]
    Server(String),

    #[error("invalid server address {0:?}")]
    InvalidAddress(String),

    #[error("connection closed before a response was received")]
    Disconnected,
}

/// Failures reported by a channel's `deliver`.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel i/o error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("channel used before initialize succeeded")]
    NotInitialized,

    #[error("channel rejected message: {0}")]
    Rejected(String),
}

/// Failures of the log server host.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ring capacity must be greater than zero")]
    InvalidCapacity,

    #[error("server i/o error: {0}")]
    Io(#[from] io::Error),
}
