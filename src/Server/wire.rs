// Wire representation of messages and the bodies of the HTTP endpoints
// served under `/Athena`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{LogLevel, Message};

/// Prefix shared by every endpoint of the log server.
pub const SERVICE_PATH: &str = "/Athena";

/// `POST` a [`WireMessage`]; answered with `204 No Content`.
pub const WRITE_MESSAGE_PATH: &str = "/Athena/WriteMessage";

/// `POST` a [`MessagesQuery`]; answered with a JSON array of [`WireMessage`].
pub const GET_MESSAGES_PATH: &str = "/Athena/GetMessages";

/// A message as exchanged with the log server. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub time: DateTime<Utc>,
    /// Serialized as the level ordinal.
    pub level: LogLevel,
    pub process_name: String,
    pub method_name: String,
    pub text: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            time: msg.time(),
            level: msg.level(),
            process_name: msg.process().to_owned(),
            method_name: msg.method().to_owned(),
            text: msg.text().to_owned(),
        }
    }
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Message::with_time(
            wire.time,
            wire.level,
            wire.process_name,
            wire.method_name,
            wire.text,
        )
    }
}

/// Body of a query. `since: null` asks for every stored message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesQuery {
    pub since: Option<DateTime<Utc>>,
}
