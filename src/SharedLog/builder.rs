use super::layout::{clip_utf8, MAX_PROCESS_NAME_BYTES};
use super::ring_log::{Scope, SharedRingLog};
use crate::error::SharedLogError;

/// Configures and opens a [`SharedRingLog`] handle.
pub struct SharedLogBuilder {
    scope: Scope,
    namespace: String,
    process_name: Option<String>,
    exit_hook: bool,
}

impl Default for SharedLogBuilder {
    fn default() -> Self {
        Self {
            scope: Scope::Local,
            namespace: String::new(), // the well-known segment
            process_name: None,       // detected from the executable
            exit_hook: true,
        }
    }
}

impl SharedLogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Prefix both object names, giving an isolated ring. Handles only see
    /// each other when they use the same namespace and scope.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = Some(name.into());
        self
    }

    /// Whether opening installs the SIGINT/SIGTERM handler that closes every
    /// handle before exit. Turn it off when the program owns its own handler.
    pub fn with_exit_hook(mut self, install: bool) -> Self {
        self.exit_hook = install;
        self
    }

    pub fn open(self) -> Result<SharedRingLog, SharedLogError> {
        let process = self
            .process_name
            .unwrap_or_else(crate::Core::process::current_process_name);
        let process = clip_utf8(&process, MAX_PROCESS_NAME_BYTES).to_owned();
        let log = SharedRingLog::attach(self.scope, &self.namespace, process)?;
        if self.exit_hook {
            crate::Core::exit::install_exit_hook();
        }
        Ok(log)
    }
}
