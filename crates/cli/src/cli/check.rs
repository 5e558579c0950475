use anyhow::{Context, Result};
use std::path::Path;

use dashkiosk_core::config::Config;
use dashkiosk_core::kiosk::receiver_url;

pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::read(config_path)
        .with_context(|| format!("cannot read {}", config_path.display()))?;

    let timeout = config.timeout()?;
    let url = receiver_url(&config.ping_url()?, env!("CARGO_PKG_VERSION"))?;

    println!("Config OK: {}", config_path.display());
    println!("  Receiver: {}", url);
    println!("  Heartbeat timeout: {} ms", timeout.as_millis());
    println!("  Loader: {}", config.get_value("browser.loader")?);
    println!(
        "  Insecure SSL: {}",
        if config.kiosk.insecure_ssl { "allowed" } else { "rejected" }
    );
    if config.server.enabled {
        println!(
            "  Bridge: http://{}:{}",
            config.server.bind, config.server.port
        );
    } else {
        println!("  Bridge: disabled");
    }

    Ok(())
}
