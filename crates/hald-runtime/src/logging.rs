//! Structured logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level. Without it the
//! `logging.level` directive from the config is used.

use crate::config::LoggingConfig;
use crate::error::RuntimeError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter for `config`, honouring `RUST_LOG` first.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, RuntimeError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| RuntimeError::Logging(e.to_string()))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), RuntimeError> {
    let env_filter = env_filter(config)?;

    if config.json {
        // JSON lines for journald and log shippers
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| RuntimeError::Logging(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| RuntimeError::Logging(e.to_string()))?;
    }

    tracing::info!(
        level = %config.level,
        json = config.json,
        "Logging initialized"
    );
    Ok(())
}
