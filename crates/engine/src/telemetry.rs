//! Tracing and metrics initialisation.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::config::{EngineConfig, LogFormat};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
    #[error("failed to install Prometheus recorder: {0}")]
    Recorder(#[from] BuildError),
}

/// Installs the global tracing subscriber.
///
/// The filter comes from `config.log_level`; an unparseable directive falls
/// back to `info`. Fails if a subscriber is already installed.
pub fn init_tracing(config: &EngineConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }
    Ok(())
}

/// Installs the global Prometheus metrics recorder.
///
/// The returned handle renders the scrape output.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}
