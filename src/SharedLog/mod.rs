mod builder;
pub mod layout;
pub mod ring_log;

pub use builder::SharedLogBuilder;
pub use ring_log::{DiagnosticRecord, Scope, SharedRingLog};
