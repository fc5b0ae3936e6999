use std::io::{self, Write};

use colored::Colorize;

use crate::error::ChannelError;
use crate::message::{LogLevel, Message};
use crate::Dispatch::channel::LogChannel;

/// Width of the `[Level]:` column.
const TAG_WIDTH: usize = 12;

/// Writes one line per message to standard output (or any writer).
///
/// ```text
/// [Info]:     2024-05-01 12:00:00 load_config::loaded 3 entries
/// ```
pub struct ConsoleChannel {
    out: Box<dyn Write + Send>,
    colorize: bool,
}

impl ConsoleChannel {
    /// Colored output on stdout.
    pub fn stdout() -> Self {
        Self {
            out: Box::new(io::stdout()),
            colorize: true,
        }
    }

    /// Plain output on an arbitrary writer.
    pub fn with_writer<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            out: Box::new(out),
            colorize: false,
        }
    }

    pub fn colorize(mut self, on: bool) -> Self {
        self.colorize = on;
        self
    }

    /// Render the line written for `message`, without color codes.
    pub fn format_line(message: &Message) -> String {
        format!(
            "{}{}",
            Self::tag(message.level()),
            Self::body(message)
        )
    }

    fn tag(level: LogLevel) -> String {
        format!("{:<width$}", format!("[{level}]:"), width = TAG_WIDTH)
    }

    fn body(message: &Message) -> String {
        format!(
            "{} {}::{}",
            message.time().format("%Y-%m-%d %H:%M:%S"),
            message.method(),
            message.text()
        )
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::stdout()
    }
}

impl LogChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn initialize(&mut self) -> bool {
        true
    }

    fn deliver(&mut self, message: &Message) -> Result<(), ChannelError> {
        let tag = Self::tag(message.level());
        let tag = if self.colorize {
            match message.level() {
                LogLevel::Info => tag.cyan().to_string(),
                LogLevel::Success => tag.green().to_string(),
                LogLevel::Warning => tag.yellow().to_string(),
                LogLevel::Error => tag.red().to_string(),
                LogLevel::Fatal => tag.red().bold().to_string(),
                LogLevel::Trace | LogLevel::Debug => tag,
            }
        } else {
            tag
        };
        writeln!(self.out, "{}{}", tag, Self::body(message))?;
        self.out.flush()?;
        Ok(())
    }
}
