// Log message value type shared by the dispatcher, its channels and the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Method name recorded when the producer cannot tell where a message came from.
pub const DEFAULT_METHOD_NAME: &str = "No Data";

/// Severity of a log message.
///
/// The discriminant is the ordinal carried on the wire, so variants must
/// never be reordered.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Success = 3,
    Warning = 4,
    Error = 5,
    Fatal = 6,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Success,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Success => "Success",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        }
    }
}

impl From<LogLevel> for u8 {
    fn from(level: LogLevel) -> u8 {
        level as u8
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, String> {
        LogLevel::ALL
            .get(v as usize)
            .copied()
            .ok_or_else(|| format!("unknown log level ordinal {v}"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width specifiers like {:<12} work
        f.pad(self.as_str())
    }
}

/// An immutable log message.
///
/// Strings are reference counted so fanning a message out to many channels
/// (or cloning it into a test stub) never copies the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    time: DateTime<Utc>,
    level: LogLevel,
    process: Arc<str>,
    method: Arc<str>,
    text: Arc<str>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(
        level: LogLevel,
        process: impl Into<Arc<str>>,
        method: impl Into<Arc<str>>,
        text: impl Into<Arc<str>>,
    ) -> Self {
        Self::with_time(Utc::now(), level, process, method, text)
    }

    /// Create a message with an explicit timestamp.
    pub fn with_time(
        time: DateTime<Utc>,
        level: LogLevel,
        process: impl Into<Arc<str>>,
        method: impl Into<Arc<str>>,
        text: impl Into<Arc<str>>,
    ) -> Self {
        let method = method.into();
        let method = if method.is_empty() {
            Arc::from(DEFAULT_METHOD_NAME)
        } else {
            method
        };
        Self {
            time,
            level,
            process: process.into(),
            method,
            text: text.into(),
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
