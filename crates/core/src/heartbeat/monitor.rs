//! Heartbeat watchdog for the kiosk receiver page
//!
//! The receiver page calls back ("ready") whenever it is alive. Each heartbeat
//! pushes a single deadline forward; when the deadline passes without one, the
//! wait screen goes back up and the receiver is reloaded. This repeats for as
//! long as the monitor runs.
//!
//! All state lives in one task fed by a FIFO queue. Heartbeats arriving from
//! other threads and timer expiries are both messages on that queue, so
//! "cancel the pending deadline" and "the deadline fired" can never run
//! concurrently. Every armed deadline carries an epoch; an expiry whose epoch
//! is no longer current lost the race against a cancel and is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::events::{WatchdogEvent, WatchdogEventKind, WatchdogState, now_ms};
use crate::config::{ConfigError, ConfigProvider};
use crate::kiosk::{ContentLoader, WaitOverlay, receiver_url};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("heartbeat monitor is stopped")]
    Stopped,
}

#[derive(Debug)]
enum Command {
    Alive,
    Deadline { epoch: u64 },
    Stop,
}

struct PendingDeadline {
    epoch: u64,
    due: Instant,
    timer: JoinHandle<()>,
}

/// Point-in-time view of the watchdog
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    pub state: WatchdogState,
    /// Epoch of the most recently armed deadline
    pub epoch: u64,
    /// When the pending deadline fires, if one is armed
    pub next_deadline: Option<Instant>,
    pub signals: u64,
    pub reloads: u64,
    pub last_event: Option<WatchdogEvent>,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            state: WatchdogState::AwaitingSignal,
            epoch: 0,
            next_deadline: None,
            signals: 0,
            reloads: 0,
            last_event: None,
        }
    }
}

pub struct HeartbeatMonitor {
    loader: Arc<dyn ContentLoader>,
    overlay: Arc<dyn WaitOverlay>,
    config: Arc<dyn ConfigProvider>,
    /// Appended to the ping URL as `?v=`
    version: String,
    overlay_shown: bool,
    epoch: u64,
    pending: Option<PendingDeadline>,
    signals: u64,
    reloads: u64,
    tx: mpsc::UnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
    /// Set by `MonitorHandle::stop`; anything still queued is dropped.
    stopping: Arc<AtomicBool>,
    status: Arc<RwLock<MonitorStatus>>,
}

impl HeartbeatMonitor {
    pub fn new(
        loader: Arc<dyn ContentLoader>,
        overlay: Arc<dyn WaitOverlay>,
        config: Arc<dyn ConfigProvider>,
        version: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            loader,
            overlay,
            config,
            version: version.into(),
            overlay_shown: false,
            epoch: 0,
            pending: None,
            signals: 0,
            reloads: 0,
            tx,
            rx,
            stopping: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(MonitorStatus::default())),
        }
    }

    /// Show the wait screen, load the receiver and arm the first deadline,
    /// then hand the monitor over to its own task.
    ///
    /// The timeout is read before anything else happens: if it is invalid,
    /// nothing is shown, loaded or scheduled. Must be called from within a
    /// Tokio runtime.
    pub fn start(
        mut self,
    ) -> Result<(MonitorHandle, JoinHandle<Result<(), MonitorError>>), ConfigError> {
        let timeout = self.read_timeout()?;
        info!(name: "Watchdog", "starting with timeout: {:?}", timeout);

        self.show_wait_screen();
        self.load_receiver();
        self.arm_deadline(timeout);
        self.record(WatchdogEventKind::Started, self.epoch);

        let handle = MonitorHandle {
            tx: self.tx.clone(),
            stopping: self.stopping.clone(),
            status: self.status.clone(),
            config: self.config.clone(),
        };
        let task = tokio::spawn(self.run());
        Ok((handle, task))
    }

    /// Current timeout, read fresh from configuration.
    pub fn read_timeout(&self) -> Result<Duration, ConfigError> {
        self.config.timeout()
    }

    async fn run(mut self) -> Result<(), MonitorError> {
        let result = self.process().await;
        if let Err(ref e) = result {
            error!(name: "Watchdog", "stopping: {}", e);
        }
        self.shutdown();
        result
    }

    async fn process(&mut self) -> Result<(), MonitorError> {
        while let Some(command) = self.rx.recv().await {
            if self.stopping.load(Ordering::SeqCst) {
                debug!(name: "Watchdog", "dropping {:?} after stop", command);
                break;
            }
            match command {
                Command::Alive => self.on_signal_received()?,
                Command::Deadline { epoch } => self.on_deadline_fired(epoch)?,
                Command::Stop => break,
            }
        }
        Ok(())
    }

    fn on_signal_received(&mut self) -> Result<(), ConfigError> {
        debug!(name: "Watchdog", "received heartbeat");
        self.signals += 1;
        self.hide_wait_screen();
        self.cancel_deadline();
        let timeout = self.read_timeout()?;
        self.arm_deadline(timeout);
        self.record(WatchdogEventKind::Signal, self.epoch);
        Ok(())
    }

    fn on_deadline_fired(&mut self, epoch: u64) -> Result<(), ConfigError> {
        let current = self.pending.as_ref().is_some_and(|p| p.epoch == epoch);
        if !current {
            debug!(
                name: "Watchdog",
                "discarding stale deadline (epoch {}, current {})", epoch, self.epoch
            );
            self.record(WatchdogEventKind::StaleDeadline, epoch);
            return Ok(());
        }

        self.pending = None;
        self.on_deadline_expired()
    }

    fn on_deadline_expired(&mut self) -> Result<(), ConfigError> {
        info!(name: "Watchdog", "no activity from receiver, triggering reload");
        self.reloads += 1;
        self.show_wait_screen();
        self.loader.stop_loading();
        self.load_receiver();
        // Keep watching: the reload itself may never check in.
        let timeout = self.read_timeout()?;
        self.arm_deadline(timeout);
        self.record(WatchdogEventKind::Deadline, self.epoch);
        Ok(())
    }

    fn show_wait_screen(&mut self) {
        if self.overlay_shown {
            return;
        }
        self.overlay.show();
        self.overlay_shown = true;
    }

    fn hide_wait_screen(&mut self) {
        if !self.overlay_shown {
            return;
        }
        self.overlay.hide();
        self.overlay_shown = false;
    }

    fn load_receiver(&self) {
        let url = self
            .config
            .ping_url()
            .and_then(|ping_url| receiver_url(&ping_url, &self.version));
        match url {
            Ok(url) => {
                debug!(name: "Watchdog", "loading {}", url);
                self.loader.load(url.as_str());
            }
            Err(e) => warn!(name: "Watchdog", "cannot load receiver: {}", e),
        }
    }

    fn arm_deadline(&mut self, timeout: Duration) {
        self.cancel_deadline();
        self.epoch += 1;

        let epoch = self.epoch;
        let due = Instant::now() + timeout;
        let tx = self.tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(due).await;
            // The monitor may already be gone.
            let _ = tx.send(Command::Deadline { epoch });
        });

        self.pending = Some(PendingDeadline { epoch, due, timer });
    }

    fn cancel_deadline(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
    }

    fn shutdown(&mut self) {
        self.cancel_deadline();
        self.rx.close();
        self.record(WatchdogEventKind::Stopped, self.epoch);
        info!(name: "Watchdog", "stopped");
    }

    fn record(&self, kind: WatchdogEventKind, epoch: u64) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        *status = MonitorStatus {
            state: if self.overlay_shown {
                WatchdogState::AwaitingSignal
            } else {
                WatchdogState::ConfirmedAlive
            },
            epoch: self.epoch,
            next_deadline: self.pending.as_ref().map(|p| p.due),
            signals: self.signals,
            reloads: self.reloads,
            last_event: Some(WatchdogEvent {
                ts: now_ms(),
                kind,
                epoch,
            }),
        };
    }
}

/// Cloneable handle to a running monitor.
///
/// Heartbeats sent through it are queued onto the monitor task, so it can be
/// used from any thread.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<Command>,
    stopping: Arc<AtomicBool>,
    status: Arc<RwLock<MonitorStatus>>,
    config: Arc<dyn ConfigProvider>,
}

impl MonitorHandle {
    /// Deliver a heartbeat from the receiver page.
    pub fn signal(&self) -> Result<(), MonitorError> {
        if self.stopping.load(Ordering::SeqCst) {
            return Err(MonitorError::Stopped);
        }
        self.tx
            .send(Command::Alive)
            .map_err(|_| MonitorError::Stopped)
    }

    /// Cancel the pending deadline. Heartbeats and expiries still queued
    /// when this is called are dropped unprocessed.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Wakes the task if the queue is empty.
        let _ = self.tx.send(Command::Stop);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopping.load(Ordering::SeqCst) || self.tx.is_closed()
    }

    /// Current timeout, read fresh from configuration.
    pub fn read_timeout(&self) -> Result<Duration, ConfigError> {
        self.config.timeout()
    }

    pub fn status(&self) -> MonitorStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
