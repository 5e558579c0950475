mod provider;

pub use provider::{ConfigProvider, FileConfigProvider, SharedConfigProvider, parse_timeout};

#[cfg(test)]
pub use provider::MockConfigProvider;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::env::{DASHKIOSK_CONFIG, DASHKIOSK_CONFIG_DIR};

/// Errors raised while reading or validating the kiosk configuration.
///
/// A bad timeout is the one configuration problem the watchdog cannot work
/// around: without a duration nothing can be scheduled.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("ping timeout is not configured")]
    MissingTimeout,

    #[error("ping timeout {0:?} is not an integer number of milliseconds")]
    InvalidTimeout(String),

    #[error("ping timeout must be positive, got {0}")]
    NonPositiveTimeout(i64),

    #[error("ping URL is not configured")]
    MissingPingUrl,

    #[error("ping URL {url:?} is invalid: {source}")]
    InvalidPingUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unknown config key: {0}")]
    UnknownKey(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("could not determine a config directory")]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub kiosk: KioskConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Raw timeout value as written by the operator.
///
/// Both `ping_timeout = 30000` and `ping_timeout = "30000"` are accepted;
/// validation happens on every read in [`parse_timeout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeoutValue {
    Millis(i64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskConfig {
    /// Receiver page loaded in the kiosk (the version is appended as `?v=`)
    #[serde(default)]
    pub ping_url: Option<String>,

    /// Milliseconds without a heartbeat before the receiver is reloaded
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: Option<TimeoutValue>,

    /// Accept invalid TLS certificates
    #[serde(default)]
    pub insecure_ssl: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    /// Launch a browser process pointed at the receiver
    #[default]
    Browser,
    /// Headless HTTP fetch of the receiver
    Fetch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub loader: LoaderKind,

    #[serde(default = "default_browser_command")]
    pub command: String,

    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Shell command run when the wait screen is shown
    #[serde(default)]
    pub show_command: Option<String>,

    /// Shell command run when the wait screen is hidden
    #[serde(default)]
    pub hide_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_ping_timeout() -> Option<TimeoutValue> {
    Some(TimeoutValue::Millis(30_000))
}

fn default_browser_command() -> String {
    "chromium".to_string()
}

fn default_browser_args() -> Vec<String> {
    vec![
        "--kiosk".to_string(),
        "--noerrdialogs".to_string(),
        "--disable-infobars".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    31328
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            ping_url: None,
            ping_timeout: default_ping_timeout(),
            insecure_ssl: false,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            loader: LoaderKind::default(),
            command: default_browser_command(),
            args: default_browser_args(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_port(),
            bind: default_bind(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the config at `path`, writing the commented template first if the
    /// file does not exist yet.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::save_template(path)?;
        }
        Self::read(path)
    }

    /// Read and parse `path` without creating anything.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&content)?;
        config.expand_env_vars();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        write_file(path, &content)
    }

    /// Save the default config with a helpful template (for first-time setup)
    pub fn save_template(path: &Path) -> Result<(), ConfigError> {
        write_file(path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());
        Ok(())
    }

    /// Resolve the config file location.
    ///
    /// 1. `DASHKIOSK_CONFIG` (full file path)
    /// 2. `DASHKIOSK_CONFIG_DIR` (directory holding `config.toml`)
    /// 3. The platform config dir, e.g. `~/.config/dashkiosk/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(DASHKIOSK_CONFIG) {
            return Ok(PathBuf::from(path));
        }
        if let Ok(dir) = std::env::var(DASHKIOSK_CONFIG_DIR) {
            return Ok(PathBuf::from(dir).join("config.toml"));
        }
        directories::ProjectDirs::from("", "", "dashkiosk")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Current heartbeat timeout, validated.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_timeout(self.kiosk.ping_timeout.as_ref())
    }

    pub fn ping_url(&self) -> Result<String, ConfigError> {
        match self.kiosk.ping_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.to_string()),
            _ => Err(ConfigError::MissingPingUrl),
        }
    }

    fn expand_env_vars(&mut self) {
        if let Some(ref mut url) = self.kiosk.ping_url {
            *url = expand_env(url);
        }
    }

    pub fn get_value(&self, key: &str) -> Result<String, ConfigError> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["kiosk", "ping_url"] => Ok(self.kiosk.ping_url.clone().unwrap_or_default()),
            ["kiosk", "ping_timeout"] => Ok(match &self.kiosk.ping_timeout {
                Some(TimeoutValue::Millis(ms)) => ms.to_string(),
                Some(TimeoutValue::Text(text)) => text.clone(),
                None => String::new(),
            }),
            ["kiosk", "insecure_ssl"] => Ok(self.kiosk.insecure_ssl.to_string()),
            ["browser", "loader"] => Ok(match self.browser.loader {
                LoaderKind::Browser => "browser".to_string(),
                LoaderKind::Fetch => "fetch".to_string(),
            }),
            ["browser", "command"] => Ok(self.browser.command.clone()),
            ["overlay", "show_command"] => {
                Ok(self.overlay.show_command.clone().unwrap_or_default())
            }
            ["overlay", "hide_command"] => {
                Ok(self.overlay.hide_command.clone().unwrap_or_default())
            }
            ["server", "enabled"] => Ok(self.server.enabled.to_string()),
            ["server", "port"] => Ok(self.server.port.to_string()),
            ["server", "bind"] => Ok(self.server.bind.clone()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = key.split('.').collect();
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match parts.as_slice() {
            ["kiosk", "ping_url"] => self.kiosk.ping_url = Some(value.to_string()),
            ["kiosk", "ping_timeout"] => {
                let raw = TimeoutValue::Text(value.to_string());
                parse_timeout(Some(&raw))?;
                self.kiosk.ping_timeout = Some(raw);
            }
            ["kiosk", "insecure_ssl"] => {
                self.kiosk.insecure_ssl = value.parse().map_err(|_| invalid())?
            }
            ["browser", "loader"] => {
                self.browser.loader = match value {
                    "browser" => LoaderKind::Browser,
                    "fetch" => LoaderKind::Fetch,
                    _ => return Err(invalid()),
                }
            }
            ["browser", "command"] => self.browser.command = value.to_string(),
            ["overlay", "show_command"] => self.overlay.show_command = non_empty(value),
            ["overlay", "hide_command"] => self.overlay.hide_command = non_empty(value),
            ["server", "enabled"] => self.server.enabled = value.parse().map_err(|_| invalid())?,
            ["server", "port"] => self.server.port = value.parse().map_err(|_| invalid())?,
            ["server", "bind"] => self.server.bind = value.to_string(),
            ["logging", "level"] => self.logging.level = value.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, content).map_err(io_err)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn expand_env(s: &str) -> String {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else if let Some(var_name) = s.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else {
        s.to_string()
    }
}

/// Default config template with helpful comments (used for first-time setup)
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# dashkiosk configuration
# Auto-created on first run. Edit as needed; the heartbeat timeout is re-read
# every time the watchdog reschedules, so changes apply without a restart.

[kiosk]
# Receiver page. The running version is appended as ?v=<version>.
# ping_url = "http://dashboard.example/receiver"
# Milliseconds without a heartbeat before the receiver is reloaded
ping_timeout = 30000
# Accept invalid TLS certificates
insecure_ssl = false

[browser]
loader = "browser"                   # browser | fetch
command = "chromium"
args = ["--kiosk", "--noerrdialogs", "--disable-infobars"]

# Optional commands toggling an external wait screen
# [overlay]
# show_command = "xset dpms force on && feh --fullscreen /usr/share/dashkiosk/wait.png &"
# hide_command = "pkill -f wait.png"

[server]
enabled = true
port = 31328
bind = "127.0.0.1"

[logging]
level = "info"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_is_thirty_seconds() {
        let config = Config::default();
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.timeout().unwrap(), Duration::from_millis(30_000));
        assert_eq!(config.browser.loader, LoaderKind::Browser);
        assert!(config.server.enabled);
        assert!(matches!(config.ping_url(), Err(ConfigError::MissingPingUrl)));
    }

    #[test]
    fn test_timeout_accepts_string_and_integer() {
        let config: Config = toml::from_str(
            r#"
            [kiosk]
            ping_timeout = "1500"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout().unwrap(), Duration::from_millis(1500));

        let config: Config = toml::from_str("[kiosk]\nping_timeout = 2500\n").unwrap();
        assert_eq!(config.timeout().unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_unparseable_timeout_is_config_error() {
        let config: Config = toml::from_str("[kiosk]\nping_timeout = \"soon\"\n").unwrap();
        assert!(matches!(
            config.timeout(),
            Err(ConfigError::InvalidTimeout(raw)) if raw == "soon"
        ));
    }

    #[test]
    fn test_load_creates_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.port, 31328);
    }

    #[test]
    fn test_save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config
            .set_value("kiosk.ping_url", "http://dash.local/receiver")
            .unwrap();
        config.set_value("kiosk.ping_timeout", "45000").unwrap();
        config.save(&path).unwrap();

        let loaded = Config::read(&path).unwrap();
        assert_eq!(loaded.ping_url().unwrap(), "http://dash.local/receiver");
        assert_eq!(loaded.timeout().unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_set_value_rejects_bad_timeout() {
        let mut config = Config::default();
        assert!(config.set_value("kiosk.ping_timeout", "abc").is_err());
        assert!(config.set_value("kiosk.ping_timeout", "0").is_err());
        assert_eq!(config.get_value("kiosk.ping_timeout").unwrap(), "30000");
    }

    #[test]
    fn test_get_value_unknown_key() {
        let config = Config::default();
        assert!(matches!(
            config.get_value("kiosk.nope"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_loader_kind() {
        let mut config = Config::default();
        config.set_value("browser.loader", "fetch").unwrap();
        assert_eq!(config.browser.loader, LoaderKind::Fetch);
        assert!(config.set_value("browser.loader", "webkit").is_err());
    }

    #[test]
    fn test_blank_ping_url_is_missing() {
        let mut config = Config::default();
        config.kiosk.ping_url = Some("   ".to_string());
        assert!(matches!(config.ping_url(), Err(ConfigError::MissingPingUrl)));
    }
}
