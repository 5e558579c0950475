//! Configuration sources queried by the watchdog at every schedule point

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::warn;

use super::{Config, ConfigError, TimeoutValue};

/// Read access to the kiosk preferences.
///
/// Implementations must answer from the current configuration every time;
/// the watchdog relies on timeout changes applying at the next reschedule.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigProvider: Send + Sync {
    /// Heartbeat deadline, validated as a positive number of milliseconds
    fn timeout(&self) -> Result<Duration, ConfigError>;

    /// Base URL of the receiver page
    fn ping_url(&self) -> Result<String, ConfigError>;

    /// Whether TLS certificate errors should be ignored
    fn insecure_ssl(&self) -> bool;
}

/// Validate a raw timeout preference.
pub fn parse_timeout(raw: Option<&TimeoutValue>) -> Result<Duration, ConfigError> {
    let millis = match raw {
        None => return Err(ConfigError::MissingTimeout),
        Some(TimeoutValue::Millis(ms)) => *ms,
        Some(TimeoutValue::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(ConfigError::MissingTimeout);
            }
            text.parse::<i64>()
                .map_err(|_| ConfigError::InvalidTimeout(text.to_string()))?
        }
    };

    if millis <= 0 {
        return Err(ConfigError::NonPositiveTimeout(millis));
    }
    Ok(Duration::from_millis(millis as u64))
}

impl ConfigProvider for Config {
    fn timeout(&self) -> Result<Duration, ConfigError> {
        Config::timeout(self)
    }

    fn ping_url(&self) -> Result<String, ConfigError> {
        Config::ping_url(self)
    }

    fn insecure_ssl(&self) -> bool {
        self.kiosk.insecure_ssl
    }
}

/// Re-reads the config file on every query.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for FileConfigProvider {
    fn timeout(&self) -> Result<Duration, ConfigError> {
        Config::read(&self.path)?.timeout()
    }

    fn ping_url(&self) -> Result<String, ConfigError> {
        Config::read(&self.path)?.ping_url()
    }

    fn insecure_ssl(&self) -> bool {
        match Config::read(&self.path) {
            Ok(config) => config.kiosk.insecure_ssl,
            Err(e) => {
                warn!("failed to read SSL policy, rejecting invalid certificates: {}", e);
                false
            }
        }
    }
}

/// In-memory config shared between the watchdog and whoever edits it.
#[derive(Debug, Clone, Default)]
pub struct SharedConfigProvider {
    inner: Arc<RwLock<Config>>,
}

impl SharedConfigProvider {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Apply an edit; visible to the next query.
    pub fn update(&self, edit: impl FnOnce(&mut Config)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        edit(&mut guard);
    }

    pub fn snapshot(&self) -> Config {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigProvider for SharedConfigProvider {
    fn timeout(&self) -> Result<Duration, ConfigError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .timeout()
    }

    fn ping_url(&self) -> Result<String, ConfigError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ping_url()
    }

    fn insecure_ssl(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .kiosk
            .insecure_ssl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> TimeoutValue {
        TimeoutValue::Text(s.to_string())
    }

    #[test]
    fn test_parse_timeout_valid() {
        assert_eq!(
            parse_timeout(Some(&text(" 30000 "))).unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(
            parse_timeout(Some(&TimeoutValue::Millis(1))).unwrap(),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_parse_timeout_missing() {
        assert!(matches!(parse_timeout(None), Err(ConfigError::MissingTimeout)));
        assert!(matches!(
            parse_timeout(Some(&text(""))),
            Err(ConfigError::MissingTimeout)
        ));
    }

    #[test]
    fn test_parse_timeout_rejects_garbage() {
        assert!(matches!(
            parse_timeout(Some(&text("30s"))),
            Err(ConfigError::InvalidTimeout(_))
        ));
        assert!(matches!(
            parse_timeout(Some(&text("1.5"))),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_parse_timeout_rejects_non_positive() {
        assert!(matches!(
            parse_timeout(Some(&text("0"))),
            Err(ConfigError::NonPositiveTimeout(0))
        ));
        assert!(matches!(
            parse_timeout(Some(&TimeoutValue::Millis(-5))),
            Err(ConfigError::NonPositiveTimeout(-5))
        ));
    }

    #[test]
    fn test_file_provider_sees_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[kiosk]\nping_timeout = \"1000\"\n").unwrap();

        let provider = FileConfigProvider::new(&path);
        assert_eq!(provider.timeout().unwrap(), Duration::from_secs(1));

        std::fs::write(&path, "[kiosk]\nping_timeout = \"2000\"\n").unwrap();
        assert_eq!(provider.timeout().unwrap(), Duration::from_secs(2));

        std::fs::write(&path, "[kiosk]\nping_timeout = \"later\"\n").unwrap();
        assert!(provider.timeout().is_err());
    }

    #[test]
    fn test_file_provider_missing_file() {
        let provider = FileConfigProvider::new("/nonexistent/dashkiosk/config.toml");
        assert!(matches!(provider.timeout(), Err(ConfigError::Io { .. })));
        assert!(!provider.insecure_ssl());
    }

    #[test]
    fn test_shared_provider_update() {
        let provider = SharedConfigProvider::new(Config::default());
        provider.update(|c| c.kiosk.ping_timeout = Some(TimeoutValue::Millis(500)));
        assert_eq!(provider.timeout().unwrap(), Duration::from_millis(500));

        provider.update(|c| c.kiosk.insecure_ssl = true);
        assert!(provider.insecure_ssl());
        assert!(provider.snapshot().kiosk.insecure_ssl);
    }
}
