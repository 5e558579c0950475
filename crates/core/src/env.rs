//! Environment variable constants used throughout the application.
//!
//! Centralized definition of all `DASHKIOSK_*` environment variables to ensure
//! consistency and avoid hardcoded strings.

/// Configuration file path override (CLI arg default env)
pub const DASHKIOSK_CONFIG: &str = "DASHKIOSK_CONFIG";

/// Config directory override (e.g. `~/.config/dashkiosk`)
pub const DASHKIOSK_CONFIG_DIR: &str = "DASHKIOSK_CONFIG_DIR";
