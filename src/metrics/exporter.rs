//! Prometheus metrics exporter
//!
//! Installs the global metrics recorder, optionally serving it over HTTP.

use crate::metrics::recorder::init_metrics;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;

/// Global prometheus handle
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics exporter configuration
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// Serve `/metrics` on this address; `None` only keeps the in-process handle
    pub listen_addr: Option<SocketAddr>,
}

impl MetricsConfig {
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: Some(addr),
        }
    }
}

/// Install the Prometheus recorder.
///
/// Serving over HTTP needs a running tokio runtime. Subsequent calls return
/// the existing handle.
pub fn install_metrics_recorder(
    config: MetricsConfig,
) -> Result<&'static PrometheusHandle, MetricsError> {
    init_metrics();

    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }

    let handle = match config.listen_addr {
        Some(addr) => {
            let runtime =
                tokio::runtime::Handle::try_current().map_err(|e| MetricsError::SetupFailed(e.to_string()))?;
            let (recorder, exporter) = PrometheusBuilder::new()
                .with_http_listener(addr)
                .build()
                .map_err(|e| MetricsError::SetupFailed(e.to_string()))?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|_| MetricsError::AlreadyInitialized)?;
            runtime.spawn(async move {
                if let Err(e) = exporter.await {
                    tracing::warn!("Metrics exporter stopped: {:?}", e);
                }
            });
            handle
        }
        None => PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| MetricsError::SetupFailed(e.to_string()))?,
    };

    let _ = PROMETHEUS_HANDLE.set(handle);
    PROMETHEUS_HANDLE
        .get()
        .ok_or(MetricsError::AlreadyInitialized)
}

/// Get the current prometheus handle (if initialized)
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in the Prometheus text format
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Errors that can occur during metrics setup
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to setup metrics: {0}")]
    SetupFailed(String),

    #[error("Metrics already initialized")]
    AlreadyInitialized,
}
