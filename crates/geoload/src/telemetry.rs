//! Process-wide tracing setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingSettings};
use crate::error::{GeoloadError, Result};

/// Builds the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level).map_err(|e| {
        GeoloadError::Telemetry(format!("Invalid log level '{}': {}", settings.level, e))
    })
}

/// Installs the global subscriber and bridges `log` records into it.
///
/// Fails if a global subscriber or logger is already installed.
pub fn init_tracing(settings: &LoggingSettings) -> Result<()> {
    let filter = build_filter(settings)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match settings.format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(true)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
    };
    installed.map_err(|e| GeoloadError::Telemetry(format!("Failed to set subscriber: {}", e)))?;

    tracing_log::LogTracer::init()
        .map_err(|e| GeoloadError::Telemetry(format!("Failed to bridge log records: {}", e)))?;

    tracing::debug!(format = ?settings.format, level = %settings.level, "Tracing initialised");
    Ok(())
}
