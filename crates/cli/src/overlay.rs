//! Wait screen driven by operator-supplied shell commands

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;
use tracing::{debug, info, warn};

use dashkiosk_core::config::OverlayConfig;
use dashkiosk_core::kiosk::WaitOverlay;

pub struct CommandOverlay {
    show_command: Option<String>,
    hide_command: Option<String>,
    shown: AtomicBool,
}

impl CommandOverlay {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            show_command: config.show_command.clone(),
            hide_command: config.hide_command.clone(),
            shown: AtomicBool::new(false),
        }
    }

    pub fn is_shown(&self) -> bool {
        self.shown.load(Ordering::SeqCst)
    }

    fn spawn(label: &'static str, command: Option<&str>) {
        let Some(command) = command else {
            return;
        };

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .spawn();

        match child {
            Ok(mut child) => {
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if status.success() => {
                            debug!("wait screen {} command finished", label)
                        }
                        Ok(status) => warn!("wait screen {} command exited with {}", label, status),
                        Err(e) => warn!("wait screen {} command failed: {}", label, e),
                    }
                });
            }
            Err(e) => warn!("failed to spawn wait screen {} command: {}", label, e),
        }
    }
}

impl WaitOverlay for CommandOverlay {
    fn show(&self) {
        if self.shown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("wait screen shown");
        Self::spawn("show", self.show_command.as_deref());
    }

    fn hide(&self) {
        if !self.shown.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("wait screen hidden");
        Self::spawn("hide", self.hide_command.as_deref());
    }
}
