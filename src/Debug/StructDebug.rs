use std::fmt;

use crate::Dispatch::Dispatcher;
use crate::Server::{LogClient, LogMonitor, RemoteForwardingChannel};
use crate::SharedLog::SharedRingLog;

/// Debug function for SharedRingLog
///
/// Shows the names and open state without touching the mapping, so it is
/// safe to call while another thread holds the segment lock.
pub fn debug_shared_ring_log(log: &SharedRingLog, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SharedRingLog")
        .field("scope", &log.scope())
        .field("segment", &log.segment_name())
        .field("mutex", &log.mutex_name())
        .field("process", &log.process_name())
        .field("open", &log.is_open())
        .finish()
}

/// Debug function for Dispatcher
///
/// Shows:
/// - Worker thread name and whether it is running
/// - Shutdown discipline
/// - Channel and queue sizes plus counters
pub fn debug_dispatcher(dispatcher: &Dispatcher, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dispatcher")
        .field("thread", &dispatcher.thread_name())
        .field("running", &dispatcher.is_running())
        .field("drain_on_stop", &dispatcher.drain_on_stop())
        .field("channels", &dispatcher.channel_count())
        .field("pending", &dispatcher.pending())
        .field("stats", &dispatcher.stats())
        .finish()
}

pub fn debug_log_client(client: &LogClient, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LogClient")
        .field("endpoint", &client.endpoint())
        .field("timeout", &client.timeout())
        .finish()
}

pub fn debug_remote_channel(channel: &RemoteForwardingChannel, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RemoteForwardingChannel")
        .field("endpoint", &channel.endpoint())
        .field("timeout", &channel.timeout())
        .finish_non_exhaustive()
}

pub fn debug_log_monitor(monitor: &LogMonitor, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LogMonitor")
        .field("connected", &monitor.is_connected())
        .field("watermark", &monitor.watermark())
        .finish_non_exhaustive()
}
