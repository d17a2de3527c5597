//! Metrics recorder for goodput monitoring
//!
//! Records event timing activity, uploader lifecycle and the goodput values
//! each upload computed.

use crate::backend::goodput::{GoodputSummary, RollingWindowReport};
use crate::measurement::Event;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Which uploader produced a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploaderKind {
    Cumulative,
    RollingWindow,
}

impl UploaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploaderKind::Cumulative => "cumulative",
            UploaderKind::RollingWindow => "rolling_window",
        }
    }
}

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    describe_counter!(
        "goodput_events_recorded_total",
        "Event start/end timestamps recorded"
    );
    describe_counter!("goodput_uploads_total", "Goodput summaries uploaded");
    describe_counter!(
        "goodput_upload_failures_total",
        "Goodput uploads that failed"
    );

    describe_gauge!("goodput_active_uploaders", "Uploaders currently running");
    describe_gauge!("goodput_percent", "Cumulative goodput of the job");
    describe_gauge!(
        "goodput_productive_seconds",
        "Completed step time of the job"
    );
    describe_gauge!("goodput_job_elapsed_seconds", "Wall time of the job");
    describe_gauge!(
        "goodput_badput_percent",
        "Share of job wall time lost to each badput category"
    );
    describe_gauge!(
        "goodput_rolling_window_percent",
        "Goodput over the most recent steps"
    );

    describe_histogram!(
        "goodput_upload_duration_seconds",
        "Time to compute and write one upload"
    );
}

/// Record an event timestamp
pub fn record_event_timing(job: &str, event: Event, phase: &'static str) {
    counter!("goodput_events_recorded_total", "job" => job.to_string(), "event" => event.as_str(), "phase" => phase).increment(1);
}

pub fn record_uploader_started(job: &str, kind: UploaderKind) {
    gauge!("goodput_active_uploaders", "job" => job.to_string(), "kind" => kind.as_str())
        .increment(1.0);
}

pub fn record_uploader_stopped(job: &str, kind: UploaderKind) {
    gauge!("goodput_active_uploaders", "job" => job.to_string(), "kind" => kind.as_str())
        .decrement(1.0);
}

pub fn record_upload(job: &str, kind: UploaderKind) {
    counter!("goodput_uploads_total", "job" => job.to_string(), "kind" => kind.as_str())
        .increment(1);
}

pub fn record_upload_failed(job: &str, kind: UploaderKind, reason: &str) {
    counter!("goodput_upload_failures_total", "job" => job.to_string(), "kind" => kind.as_str(), "reason" => reason.to_string()).increment(1);
}

/// Publish a cumulative summary as gauges
pub fn record_goodput_summary(summary: &GoodputSummary) {
    let job = summary.job_name.clone();
    gauge!("goodput_percent", "job" => job.clone()).set(summary.goodput_percent);
    gauge!("goodput_productive_seconds", "job" => job.clone()).set(summary.productive_seconds);
    gauge!("goodput_job_elapsed_seconds", "job" => job.clone())
        .set(summary.job_elapsed_seconds);

    for (badput_type, pct) in &summary.badput_percent {
        gauge!("goodput_badput_percent", "job" => job.clone(), "badput_type" => badput_type.clone())
            .set(*pct);
    }
}

/// Publish rolling-window goodput as gauges
pub fn record_rolling_window(report: &RollingWindowReport) {
    for window in &report.windows {
        gauge!("goodput_rolling_window_percent", "job" => report.job_name.clone(), "window" => window.window_size.to_string())
            .set(window.goodput_percent);
    }
}

/// Helper struct to time a single upload
pub struct UploadTimer {
    start_time: Instant,
}

impl UploadTimer {
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Stop timing and record the duration
    pub fn stop(self) {
        histogram!("goodput_upload_duration_seconds").record(self.start_time.elapsed().as_secs_f64());
    }
}
