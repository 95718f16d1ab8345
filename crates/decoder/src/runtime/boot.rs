//! Boot — logging init and config load.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::{ConfigError, DecoderConfig};

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr; stdout carries decoded records only.
pub fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config, then bring up logging with its filter.
pub fn boot() -> Result<DecoderConfig, ConfigError> {
    let config = DecoderConfig::load()?;
    init_logging(&config.log_filter);

    info!("Starting haproxy-decode v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Loaded configuration: on_malformed={}, output={}, report_metrics={}",
        config.on_malformed, config.output, config.report_metrics
    );

    Ok(config)
}
