//! Kiosk collaborators: the engine that renders the receiver page and the
//! wait screen covering it while the page is not confirmed alive.
//!
//! Both are fire-and-forget from the watchdog's point of view. Neither call
//! reports completion; a load that never succeeds simply never produces a
//! heartbeat, and the next deadline retries it.

mod policy;

pub use policy::{DialogKind, EngineRequest, KioskPolicy, PolicyDecision};

use url::Url;

use crate::config::ConfigError;

/// Rendering engine surface used by the watchdog.
#[cfg_attr(test, mockall::automock)]
pub trait ContentLoader: Send + Sync {
    /// Start loading `url`, replacing whatever is displayed
    fn load(&self, url: &str);

    /// Abort any in-flight load
    fn stop_loading(&self);
}

/// Blocking wait screen. Both calls must be idempotent.
#[cfg_attr(test, mockall::automock)]
pub trait WaitOverlay: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Build the receiver URL: the ping URL with `v=<version>` appended.
pub fn receiver_url(ping_url: &str, version: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(ping_url).map_err(|source| ConfigError::InvalidPingUrl {
        url: ping_url.to_string(),
        source,
    })?;
    url.query_pairs_mut().append_pair("v", version);
    Ok(url)
}
