//! Log subscriber configuration.

use ripple_core::{config::TelemetryConfig, Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to the configured directive.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(directive),
        _ => EnvFilter::try_new(&config.log_filter),
    }
    .map_err(|e| Error::internal(format!("Invalid log filter: {}", e)))
}

/// Install the global subscriber. Fails if one is already set.
pub fn configure_tracing(config: &TelemetryConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(config)?);

    let installed = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.map_err(|e| Error::internal(format!("Failed to install log subscriber: {}", e)))?;

    tracing::debug!(json = config.json_logs, "Log subscriber installed");
    Ok(())
}
