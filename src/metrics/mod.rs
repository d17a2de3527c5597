//! Metrics and observability module
//!
//! Prometheus-compatible metrics for goodput monitoring.
//!
//! Key metrics exposed:
//! - Event timing activity per job and event
//! - Uploader lifecycle and upload outcomes
//! - Cumulative goodput and badput breakdown
//! - Rolling-window goodput per window size

pub mod exporter;
pub mod recorder;

pub use exporter::{install_metrics_recorder, render_metrics, MetricsConfig, MetricsError};
pub use recorder::{init_metrics, UploaderKind};
