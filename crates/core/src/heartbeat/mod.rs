//! Heartbeat watchdog: reload the receiver whenever it stops checking in

mod events;
mod monitor;

pub use events::{WatchdogEvent, WatchdogEventKind, WatchdogState, now_ms};
pub use monitor::{HeartbeatMonitor, MonitorError, MonitorHandle, MonitorStatus};
