//! Object exposed to the receiver page's scripts.
//!
//! The page calls `ready()` on every heartbeat, may ask for the current
//! `timeout()` to pace itself, and can forward diagnostics through `log()`.
//! How these calls reach the process (HTTP, IPC, an embedded engine binding)
//! is up to the transport; this type only routes them.

use tracing::debug;

use crate::config::ConfigError;
use crate::heartbeat::{MonitorError, MonitorHandle};

#[derive(Clone)]
pub struct SignalBridge {
    monitor: MonitorHandle,
}

impl SignalBridge {
    pub fn new(monitor: MonitorHandle) -> Self {
        Self { monitor }
    }

    /// Heartbeat from the page; queued onto the watchdog.
    pub fn ready(&self) -> Result<(), MonitorError> {
        self.monitor.signal()
    }

    /// Current heartbeat timeout in milliseconds.
    pub fn timeout(&self) -> Result<u64, ConfigError> {
        let timeout = self.monitor.read_timeout()?;
        Ok(timeout.as_millis() as u64)
    }

    pub fn log(&self, message: &str) {
        debug!(name: "Bridge", "javascript log: {}", message);
    }

    pub fn monitor(&self) -> &MonitorHandle {
        &self.monitor
    }
}
