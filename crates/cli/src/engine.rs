//! Content loaders driving what the kiosk displays

use anyhow::Result;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dashkiosk_core::config::{BrowserConfig, ConfigProvider};
use dashkiosk_core::kiosk::{ContentLoader, EngineRequest, KioskPolicy, PolicyDecision};

/// Browser arguments derived from the kiosk policy, appended to the
/// configured ones.
pub fn kiosk_args(browser: &BrowserConfig, config: &dyn ConfigProvider) -> Vec<String> {
    let policy = KioskPolicy::new(config);
    let mut args = browser.args.clone();

    let certificate = EngineRequest::CertificateError {
        url: "*".to_string(),
    };
    if policy.decide(&certificate) == PolicyDecision::Proceed {
        args.push("--ignore-certificate-errors".to_string());
    }
    if policy.remote_debugging() {
        args.push("--remote-debugging-port=9222".to_string());
    }
    args
}

/// Runs a browser process showing the receiver; one process at a time.
pub struct BrowserLoader {
    command: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl BrowserLoader {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            child: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        let mut guard = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn kill(child: &mut Child) {
        if let Err(e) = child.start_kill() {
            debug!("browser already gone: {}", e);
        }
    }
}

impl ContentLoader for BrowserLoader {
    fn load(&self, url: &str) {
        let mut guard = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut previous) = guard.take() {
            Self::kill(&mut previous);
        }

        let spawned = Command::new(&self.command)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => {
                info!("launched {} (pid {:?}) on {}", self.command, child.id(), url);
                *guard = Some(child);
            }
            Err(e) => warn!("failed to launch {}: {}", self.command, e),
        }
    }

    fn stop_loading(&self) {
        let mut guard = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut child) = guard.take() {
            debug!("stopping browser (pid {:?})", child.id());
            Self::kill(&mut child);
        }
    }
}

/// Headless loader: fetches the receiver over HTTP and logs the outcome.
pub struct FetchLoader {
    client: reqwest::Client,
    config: Arc<dyn ConfigProvider>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl FetchLoader {
    /// The TLS policy is fixed when the client is built.
    pub fn new(config: Arc<dyn ConfigProvider>) -> Result<Self> {
        let insecure = config.insecure_ssl();
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()?;
        Ok(Self {
            client,
            config,
            in_flight: Mutex::new(None),
        })
    }
}

impl ContentLoader for FetchLoader {
    fn load(&self, url: &str) {
        let client = self.client.clone();
        let config = self.config.clone();
        let url = url.to_string();
        let task = tokio::spawn(async move {
            let (code, description) = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("fetched {} ({})", url, resp.status());
                    return;
                }
                Ok(resp) => (i32::from(resp.status().as_u16()), resp.status().to_string()),
                Err(e) => (-1, e.to_string()),
            };
            warn!("receiver fetch failed: {}", description);
            KioskPolicy::new(config.as_ref()).decide(&EngineRequest::LoadError {
                code,
                description,
                failing_url: url,
            });
        });

        let mut guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = guard.replace(task) {
            previous.abort();
        }
    }

    fn stop_loading(&self) {
        let mut guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = guard.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashkiosk_core::config::Config;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_kiosk_args_follow_policy() {
        let mut config = Config::default();
        let args = kiosk_args(&config.browser, &config);
        assert!(args.contains(&"--kiosk".to_string()));
        assert!(!args.contains(&"--ignore-certificate-errors".to_string()));
        assert_eq!(args.last().unwrap(), "--remote-debugging-port=9222");

        config.kiosk.insecure_ssl = true;
        let args = kiosk_args(&config.browser, &config);
        assert!(args.contains(&"--ignore-certificate-errors".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_browser_loader_replaces_and_stops_process() {
        let loader = BrowserLoader::new("sleep", Vec::new());
        assert!(!loader.is_running());

        loader.load("30");
        assert!(loader.is_running());

        loader.load("30");
        assert!(loader.is_running());

        loader.stop_loading();
        assert!(!loader.is_running());
    }

    #[tokio::test]
    async fn test_browser_loader_missing_binary_is_logged() {
        let loader = BrowserLoader::new("/nonexistent/dashkiosk-browser", Vec::new());
        loader.load("http://dash.local/receiver?v=1.0");
        assert!(!loader.is_running());
        loader.stop_loading();
    }

    #[tokio::test]
    async fn test_fetch_loader_requests_receiver() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                .await
                .unwrap();
            let _ = tx.send(request);
        });

        let loader = FetchLoader::new(Arc::new(Config::default())).unwrap();
        loader.load(&format!("http://{addr}/receiver?v=1.0"));

        let request = tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .unwrap()
            .unwrap();
        assert!(request.starts_with("GET /receiver?v=1.0 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_loader_stop_aborts_in_flight() {
        let loader = FetchLoader::new(Arc::new(Config::default())).unwrap();
        // Unroutable address: the request would hang until aborted.
        loader.load("http://10.255.255.1/receiver?v=1.0");
        loader.stop_loading();
        assert!(loader.in_flight.lock().unwrap().is_none());
    }
}
