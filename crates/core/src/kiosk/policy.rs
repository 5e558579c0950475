//! How the kiosk answers requests coming from the displayed page

use std::fmt;

use tracing::debug;

use crate::config::ConfigProvider;

/// JavaScript modal dialog types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
    BeforeUnload,
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialogKind::Alert => "alert",
            DialogKind::Confirm => "confirm",
            DialogKind::Prompt => "prompt",
            DialogKind::BeforeUnload => "beforeunload",
        };
        f.write_str(name)
    }
}

/// Something the page (or the engine on its behalf) asks the kiosk to do
#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    LoadError {
        code: i32,
        description: String,
        failing_url: String,
    },
    CertificateError {
        url: String,
    },
    Fullscreen {
        enter: bool,
    },
    ModalDialog {
        kind: DialogKind,
        message: String,
    },
    CloseWindow,
    FileChooser {
        accept: String,
    },
    OpenWindow {
        url: String,
    },
}

/// Answer given back to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Let the engine carry on (certificate accepted)
    Proceed,
    /// Refuse the request
    Deny,
    /// Swallow the request without user-visible effect
    Ignore,
}

/// Kiosk mode: nothing the page does may interrupt the display.
pub struct KioskPolicy<'a> {
    config: &'a dyn ConfigProvider,
}

impl<'a> KioskPolicy<'a> {
    pub fn new(config: &'a dyn ConfigProvider) -> Self {
        Self { config }
    }

    /// Remote debugging stays on so a wedged screen can be inspected.
    pub fn remote_debugging(&self) -> bool {
        true
    }

    pub fn decide(&self, request: &EngineRequest) -> PolicyDecision {
        match request {
            EngineRequest::LoadError {
                code,
                description,
                failing_url,
            } => {
                // The next missed deadline reloads; nothing to do here.
                debug!("load failed for {} ({}): {}", failing_url, code, description);
                PolicyDecision::Ignore
            }
            EngineRequest::CertificateError { url } => {
                if self.config.insecure_ssl() {
                    debug!("accepting invalid certificate for {}", url);
                    PolicyDecision::Proceed
                } else {
                    debug!("rejecting invalid certificate for {}", url);
                    PolicyDecision::Deny
                }
            }
            EngineRequest::Fullscreen { enter } => {
                debug!("ignore fullscreen request (enter: {})", enter);
                PolicyDecision::Ignore
            }
            EngineRequest::ModalDialog { kind, message } => {
                debug!("ignore JS modal dialog (type: {}, message: {})", kind, message);
                PolicyDecision::Ignore
            }
            EngineRequest::CloseWindow => {
                debug!("ignore request to close window");
                PolicyDecision::Ignore
            }
            EngineRequest::FileChooser { accept } => {
                debug!("ignore request to open a file chooser (accept: {})", accept);
                PolicyDecision::Ignore
            }
            EngineRequest::OpenWindow { url } => {
                debug!("deny script request to open {}", url);
                PolicyDecision::Deny
            }
        }
    }
}
