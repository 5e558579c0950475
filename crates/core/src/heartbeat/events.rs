//! Watchdog event tracking for status display

use serde::{Deserialize, Serialize};

/// What the watchdog just did
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatchdogEventKind {
    /// Monitor started: wait screen shown, receiver loaded, first deadline armed
    Started,
    /// Heartbeat received from the page, deadline pushed forward
    Signal,
    /// Deadline hit without a heartbeat, receiver reloaded
    Deadline,
    /// A cancelled deadline fired anyway and was discarded
    StaleDeadline,
    /// Monitor stopped
    Stopped,
}

/// Logical watchdog state, tracked through the wait screen
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatchdogState {
    /// Wait screen shown, no heartbeat since the last (re)load
    AwaitingSignal,
    /// Wait screen hidden, page confirmed alive
    ConfirmedAlive,
}

/// A watchdog event for tracking/display
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WatchdogEvent {
    /// Timestamp in milliseconds
    pub ts: u64,
    pub kind: WatchdogEventKind,
    /// Epoch of the deadline armed (or discarded) by this event
    pub epoch: u64,
}

/// Helper to get current timestamp in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
