//! dashkiosk core: the heartbeat watchdog that keeps a kiosk dashboard alive.
//!
//! This crate holds the platform-independent logic consumed by the CLI and the
//! bridge server. It knows nothing about a concrete rendering engine; callers
//! plug one in through the [`kiosk::ContentLoader`] and [`kiosk::WaitOverlay`]
//! traits.

pub mod bridge;
pub mod config;
pub mod env;
pub mod heartbeat;
pub mod kiosk;

pub use bridge::SignalBridge;
pub use config::{Config, ConfigError};
pub use heartbeat::{HeartbeatMonitor, MonitorError, MonitorHandle};
