use crate::backend::error::BackendResult;
use crate::measurement::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extra options for publishing goodput to GCP monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpOptions {
    pub enable_gcp_goodput_metrics: bool,
    pub enable_gcp_step_deviation_metrics: bool,
}

/// Parameters an uploader session is constructed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorOptions {
    pub job_name: String,
    pub logger_name: String,
    /// Where summaries are written
    pub upload_dir: String,
    /// Seconds between uploads
    pub upload_interval: u64,
    pub monitoring_enabled: bool,
    pub pathway_enabled: bool,
    pub include_badput_breakdown: bool,
    /// Only present when GCP metrics were requested
    pub gcp_options: Option<GcpOptions>,
}

/// Records start/end timestamps for job events.
pub trait EventTimer: Send {
    fn record_start(&mut self, event: Event, at: DateTime<Utc>) -> BackendResult<()>;

    fn record_end(&mut self, event: Event, at: DateTime<Utc>) -> BackendResult<()>;
}

/// Periodically pushes goodput metrics somewhere.
pub trait GoodputMonitor: Send {
    fn start_goodput_uploader(&mut self) -> BackendResult<()>;

    fn stop_goodput_uploader(&mut self) -> BackendResult<()>;

    fn start_rolling_window_goodput_uploader(&mut self, window_sizes: &[u32]) -> BackendResult<()>;

    fn stop_rolling_window_goodput_uploader(&mut self) -> BackendResult<()>;
}

/// Factory for the monitoring library's event timers and uploaders.
pub trait MonitoringBackend: Send + Sync {
    fn event_timer(&self, job_name: &str, logger_name: &str) -> BackendResult<Box<dyn EventTimer>>;

    fn goodput_monitor(&self, options: &MonitorOptions) -> BackendResult<Box<dyn GoodputMonitor>>;
}
