use std::sync::Arc;

use super::dispatcher::Dispatcher;
use crate::message::{LogLevel, Message, DEFAULT_METHOD_NAME};

/// Producer-side handle on a [`Dispatcher`].
///
/// The process name is captured once when the logger is created. Plain
/// level methods record [`DEFAULT_METHOD_NAME`]; use [`log_at!`](crate::log_at)
/// to record the calling function instead.
#[derive(Clone)]
pub struct Logger<'a> {
    dispatcher: &'a Dispatcher,
    process: Arc<str>,
}

impl<'a> Logger<'a> {
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            dispatcher,
            process: Arc::from(crate::Core::process::current_process_name()),
        }
    }

    pub fn with_process_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.process = name.into();
        self
    }

    pub fn process_name(&self) -> &str {
        &self.process
    }

    pub fn write(&self, level: LogLevel, method: &str, text: impl Into<Arc<str>>) {
        self.dispatcher
            .enqueue(Message::new(level, Arc::clone(&self.process), method, text));
    }

    pub fn trace(&self, text: impl Into<Arc<str>>) {
        self.write(LogLevel::Trace, DEFAULT_METHOD_NAME, text);
    }

    pub fn debug(&self, text: impl Into<Arc<str>>) {
        self.write(LogLevel::Debug, DEFAULT_METHOD_NAME, text);
    }

    pub fn info(&self, text: impl Into<Arc<str>>) {
        self.write(LogLevel::Info, DEFAULT_METHOD_NAME, text);
    }

    pub fn success(&self, text: impl Into<Arc<str>>) {
        self.write(LogLevel::Success, DEFAULT_METHOD_NAME, text);
    }

    pub fn warning(&self, text: impl Into<Arc<str>>) {
        self.write(LogLevel::Warning, DEFAULT_METHOD_NAME, text);
    }

    pub fn error(&self, text: impl Into<Arc<str>>) {
        self.write(LogLevel::Error, DEFAULT_METHOD_NAME, text);
    }

    pub fn fatal(&self, text: impl Into<Arc<str>>) {
        self.write(LogLevel::Fatal, DEFAULT_METHOD_NAME, text);
    }
}

/// Name of the enclosing function (last path segment, closures skipped).
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __here() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(__here);
        let name = name.strip_suffix("::__here").unwrap_or(name);
        name.rsplit("::")
            .find(|segment| *segment != "{{closure}}")
            .unwrap_or(name)
    }};
}

/// Log through a [`Logger`] recording the calling function's name.
///
/// ```ignore
/// log_at!(logger, LogLevel::Info, "loaded {} entries", n);
/// ```
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.write($level, $crate::function_name!(), ::std::format!($($arg)+))
    };
}
