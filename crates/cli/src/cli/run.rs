use anyhow::{Context, Result, anyhow};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use dashkiosk_core::config::{Config, ConfigProvider, FileConfigProvider, LoaderKind};
use dashkiosk_core::kiosk::ContentLoader;
use dashkiosk_core::{HeartbeatMonitor, SignalBridge};
use dashkiosk_server::Server;

use crate::engine::{BrowserLoader, FetchLoader, kiosk_args};
use crate::overlay::CommandOverlay;

#[derive(Args)]
pub struct RunArgs {
    /// Don't start the HTTP bridge (heartbeats must arrive some other way)
    #[arg(long)]
    pub no_server: bool,
}

pub async fn run(args: RunArgs, config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    // Preferences are re-read on every query so edits apply at the next deadline.
    let provider: Arc<dyn ConfigProvider> = Arc::new(FileConfigProvider::new(config_path));

    let loader: Arc<dyn ContentLoader> = match config.browser.loader {
        LoaderKind::Browser => Arc::new(BrowserLoader::new(
            config.browser.command.clone(),
            kiosk_args(&config.browser, provider.as_ref()),
        )),
        LoaderKind::Fetch => Arc::new(FetchLoader::new(provider.clone())?),
    };
    let overlay = Arc::new(CommandOverlay::new(&config.overlay));

    println!("Starting dashkiosk {}...", env!("CARGO_PKG_VERSION"));
    println!("  Config: {}", config_path.display());

    let monitor = HeartbeatMonitor::new(
        loader,
        overlay,
        provider.clone(),
        env!("CARGO_PKG_VERSION"),
    );
    let (handle, mut monitor_task) = monitor
        .start()
        .context("cannot start heartbeat monitor")?;
    // Display only: the monitor owns the authoritative read.
    if let Ok(timeout) = handle.read_timeout() {
        println!("  Heartbeat timeout: {} ms", timeout.as_millis());
    }

    let mut handles = JoinSet::new();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    if config.server.enabled && !args.no_server {
        let server = Server::new(&config, SignalBridge::new(handle.clone()));
        println!("  Bridge: http://{}", server.addr());
        handles.spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            server.run(shutdown).await
        });
    } else {
        println!("  Bridge: disabled");
    }

    // A service that ends on its own takes the monitor down with it: without
    // the bridge no heartbeat can ever arrive.
    let mut failure: Option<anyhow::Error> = None;
    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => println!("\nShutting down..."),
                Err(e) => failure = Some(anyhow::Error::new(e).context("cannot listen for Ctrl-C")),
            }
            handle.stop();
            monitor_task.await
        }
        finished = &mut monitor_task => finished,
        Some(joined) = handles.join_next() => {
            let error = match joined {
                Ok(Ok(())) => anyhow!("bridge server exited unexpectedly"),
                Ok(Err(e)) => e.context("bridge server failed"),
                Err(e) => anyhow::Error::new(e).context("bridge server task failed"),
            };
            tracing::error!("{:#}", error);
            failure = Some(error);
            handle.stop();
            monitor_task.await
        }
    };

    let _ = shutdown_tx.send(());
    while let Some(joined) = handles.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("bridge server error: {:#}", e),
            Err(e) => tracing::warn!("service task failed: {}", e),
        }
    }

    let monitor = result.context("heartbeat monitor task failed")?;
    if let Some(e) = failure {
        return Err(e);
    }
    monitor.context("heartbeat monitor stopped")?;
    Ok(())
}
