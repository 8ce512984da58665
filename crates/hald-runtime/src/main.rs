//! # hald
//!
//! Hardware abstraction daemon entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use hald_runtime::{init_logging, HaldRuntime, RuntimeConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = RuntimeConfig::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let runtime = Arc::new(HaldRuntime::new(config));
    let observer = runtime.spawn_store_observer();

    // Coldplug must succeed before live events are accepted
    if let Err(e) = runtime.start().await {
        error!(error = %e, "Coldplug failed, aborting startup");
        runtime.shutdown();
        return Err(e).context("Failed to populate the device store");
    }

    let worker = tokio::spawn({
        let runtime = Arc::clone(&runtime);
        async move { runtime.run().await }
    });

    info!("hald is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    runtime.shutdown();
    let dispatched = worker.await??;
    observer.await?;

    info!(dispatched, "Shutdown complete");
    Ok(())
}
