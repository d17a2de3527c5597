//! In-process monitoring backend
//!
//! Keeps event logs in memory and writes JSON goodput summaries to a local
//! directory. Uploaders run as tokio tasks; stopping one performs a final
//! upload synchronously so the last summary always reflects the full job.
//! Periodic and final writes for one uploader are serialized through an
//! [`UploadGate`]; once the final upload has claimed the gate, periodic
//! writes still in flight are discarded.

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::goodput::{EventLog, GoodputSummary, RollingWindowReport};
use crate::backend::types::{EventTimer, GoodputMonitor, MonitorOptions, MonitoringBackend};
use crate::measurement::Event;
use crate::metrics::recorder::{self as metrics_recorder, UploadTimer, UploaderKind};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::RuntimeFlavor;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// File written by the cumulative uploader
pub const GOODPUT_FILE: &str = "goodput.json";

/// File written by the rolling-window uploader
pub const ROLLING_WINDOW_FILE: &str = "rolling_window_goodput.json";

type JobLogs = Arc<RwLock<HashMap<String, EventLog>>>;

/// Backend whose timers and uploaders share one in-memory log per job.
#[derive(Clone, Default)]
pub struct LocalBackend {
    logs: JobLogs,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cumulative goodput of `job_name`, if anything was recorded
    pub fn summary(&self, job_name: &str, include_badput_breakdown: bool) -> Option<GoodputSummary> {
        self.logs
            .read()
            .get(job_name)
            .map(|log| log.summary(job_name, Utc::now(), include_badput_breakdown))
    }

    pub fn rolling_window(&self, job_name: &str, window_sizes: &[u32]) -> Option<RollingWindowReport> {
        self.logs
            .read()
            .get(job_name)
            .map(|log| log.rolling_window(job_name, window_sizes, Utc::now()))
    }
}

impl MonitoringBackend for LocalBackend {
    fn event_timer(&self, job_name: &str, logger_name: &str) -> BackendResult<Box<dyn EventTimer>> {
        Ok(Box::new(LocalEventTimer {
            job_name: job_name.to_string(),
            logger_name: logger_name.to_string(),
            logs: self.logs.clone(),
        }))
    }

    fn goodput_monitor(&self, options: &MonitorOptions) -> BackendResult<Box<dyn GoodputMonitor>> {
        let dir = resolve_destination(&options.upload_dir)?;
        if options.gcp_options.is_some() {
            tracing::warn!(
                "GCP goodput metrics requested for {}; the local backend only writes files",
                options.job_name
            );
        }
        tracing::debug!(
            job = %options.job_name,
            logger = %options.logger_name,
            pathway_enabled = options.pathway_enabled,
            "Created local goodput monitor writing to {}",
            dir.display()
        );

        Ok(Box::new(LocalMonitor {
            context: UploadContext {
                monitor_id: Uuid::new_v4(),
                job_name: options.job_name.clone(),
                include_badput_breakdown: options.include_badput_breakdown,
                dir,
                logs: self.logs.clone(),
            },
            upload_interval: Duration::from_secs(options.upload_interval.max(1)),
            monitoring_enabled: options.monitoring_enabled,
            cumulative: None,
            rolling: None,
        }))
    }
}

/// Map an upload destination to a local directory.
///
/// Plain paths and `file://` URIs are accepted; any other scheme is not.
pub fn resolve_destination(upload_dir: &str) -> BackendResult<PathBuf> {
    if let Some(path) = upload_dir.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if upload_dir.contains("://") {
        return Err(BackendError::UnsupportedDestination(upload_dir.to_string()));
    }
    Ok(PathBuf::from(upload_dir))
}

struct LocalEventTimer {
    job_name: String,
    logger_name: String,
    logs: JobLogs,
}

impl EventTimer for LocalEventTimer {
    fn record_start(&mut self, event: Event, at: DateTime<Utc>) -> BackendResult<()> {
        self.logs
            .write()
            .entry(self.job_name.clone())
            .or_default()
            .record_start(event, at);
        metrics_recorder::record_event_timing(&self.job_name, event, "start");
        tracing::debug!(logger = %self.logger_name, "{} start at {}", event, at);
        Ok(())
    }

    fn record_end(&mut self, event: Event, at: DateTime<Utc>) -> BackendResult<()> {
        self.logs
            .write()
            .entry(self.job_name.clone())
            .or_default()
            .record_end(event, at)?;
        metrics_recorder::record_event_timing(&self.job_name, event, "end");
        tracing::debug!(logger = %self.logger_name, "{} end at {}", event, at);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Report {
    Cumulative,
    RollingWindow(Vec<u32>),
}

impl Report {
    fn kind(&self) -> UploaderKind {
        match self {
            Report::Cumulative => UploaderKind::Cumulative,
            Report::RollingWindow(_) => UploaderKind::RollingWindow,
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Report::Cumulative => GOODPUT_FILE,
            Report::RollingWindow(_) => ROLLING_WINDOW_FILE,
        }
    }
}

enum Snapshot {
    Cumulative(GoodputSummary),
    RollingWindow(RollingWindowReport),
}

impl Snapshot {
    fn publish(&self) {
        match self {
            Snapshot::Cumulative(summary) => metrics_recorder::record_goodput_summary(summary),
            Snapshot::RollingWindow(report) => metrics_recorder::record_rolling_window(report),
        }
    }
}

#[derive(Clone)]
struct UploadContext {
    // Distinguishes uploads of separate monitors writing for one job
    monitor_id: Uuid,
    job_name: String,
    include_badput_breakdown: bool,
    dir: PathBuf,
    logs: JobLogs,
}

impl UploadContext {
    fn snapshot(&self, report: &Report) -> BackendResult<(Snapshot, Vec<u8>)> {
        let now = Utc::now();
        let logs = self.logs.read();
        let empty = EventLog::new();
        let log = logs.get(&self.job_name).unwrap_or(&empty);

        let (snapshot, bytes) = match report {
            Report::Cumulative => {
                let summary = log.summary(&self.job_name, now, self.include_badput_breakdown);
                let bytes = serde_json::to_vec_pretty(&summary)?;
                (Snapshot::Cumulative(summary), bytes)
            }
            Report::RollingWindow(sizes) => {
                let report = log.rolling_window(&self.job_name, sizes, now);
                let bytes = serde_json::to_vec_pretty(&report)?;
                (Snapshot::RollingWindow(report), bytes)
            }
        };
        Ok((snapshot, bytes))
    }

    fn path(&self, report: &Report) -> PathBuf {
        self.dir.join(report.file_name())
    }

    /// Write `report` unless the gate is already closed.
    ///
    /// A final write closes the gate before writing. Returns whether a file
    /// was written.
    fn write_report(
        &self,
        report: &Report,
        gate: &UploadGate,
        final_upload: bool,
    ) -> BackendResult<bool> {
        let mut closed = gate.closed.lock();
        if *closed {
            return Ok(false);
        }
        if final_upload {
            *closed = true;
        }

        let timer = UploadTimer::start();
        let (snapshot, bytes) = self.snapshot(report)?;
        std::fs::create_dir_all(&self.dir)?;

        // Readers never observe a partially written summary
        let path = self.path(report);
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, bytes)?;
        std::fs::rename(&staging, &path)?;

        self.finish_upload(report, &snapshot);
        timer.stop();
        Ok(true)
    }

    fn finish_upload(&self, report: &Report, snapshot: &Snapshot) {
        snapshot.publish();
        metrics_recorder::record_upload(&self.job_name, report.kind());
        tracing::debug!(
            monitor = %self.monitor_id,
            "Uploaded {} goodput for {} to {}",
            report.kind().as_str(),
            self.job_name,
            self.path(report).display()
        );
    }
}

/// Orders the writes of one uploader.
#[derive(Default)]
struct UploadGate {
    closed: Mutex<bool>,
}

/// Run `f` off the async worker when that is possible.
///
/// Stop is synchronous and often runs from a `Drop` inside async code; on a
/// multi-thread runtime the worker is handed off while `f` blocks.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

async fn run_uploader(
    context: UploadContext,
    report: Report,
    interval: Duration,
    gate: Arc<UploadGate>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let (ctx, rep, g) = (context.clone(), report.clone(), gate.clone());
        let result = tokio::task::spawn_blocking(move || ctx.write_report(&rep, &g, false))
            .await
            .unwrap_or_else(|e| Err(BackendError::Io(std::io::Error::other(e))));

        match result {
            Ok(true) => {}
            // Stopped while this tick was pending
            Ok(false) => return,
            Err(e) => {
                tracing::warn!(
                    "Periodic {} goodput upload for {} failed: {}",
                    report.kind().as_str(),
                    context.job_name,
                    e
                );
                metrics_recorder::record_upload_failed(
                    &context.job_name,
                    report.kind(),
                    &e.to_string(),
                );
            }
        }
    }
}

struct RunningUploader {
    handle: JoinHandle<()>,
    gate: Arc<UploadGate>,
    report: Report,
}

/// Uploader pair for one job and destination.
pub struct LocalMonitor {
    context: UploadContext,
    upload_interval: Duration,
    monitoring_enabled: bool,
    cumulative: Option<RunningUploader>,
    rolling: Option<RunningUploader>,
}

impl LocalMonitor {
    pub fn upload_dir(&self) -> &Path {
        &self.context.dir
    }

    fn spawn(&self, report: Report) -> BackendResult<RunningUploader> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BackendError::NoRuntime)?;
        let kind = report.kind();
        let gate = Arc::new(UploadGate::default());
        let handle = runtime.spawn(run_uploader(
            self.context.clone(),
            report.clone(),
            self.upload_interval,
            gate.clone(),
        ));
        metrics_recorder::record_uploader_started(&self.context.job_name, kind);
        tracing::info!(
            monitor = %self.context.monitor_id,
            "Started {} goodput uploader for {} (every {:?})",
            kind.as_str(),
            self.context.job_name,
            self.upload_interval
        );
        Ok(RunningUploader { handle, gate, report })
    }

    fn stop(&self, uploader: RunningUploader) -> BackendResult<()> {
        uploader.handle.abort();
        let kind = uploader.report.kind();
        metrics_recorder::record_uploader_stopped(&self.context.job_name, kind);
        tracing::info!(
            monitor = %self.context.monitor_id,
            "Stopped {} goodput uploader for {}",
            kind.as_str(),
            self.context.job_name
        );
        run_blocking(|| {
            self.context
                .write_report(&uploader.report, &uploader.gate, true)
                .map(|_| ())
        })
    }

    fn uploader_name(&self, kind: UploaderKind) -> String {
        format!("{} ({})", self.context.job_name, kind.as_str())
    }
}

impl GoodputMonitor for LocalMonitor {
    fn start_goodput_uploader(&mut self) -> BackendResult<()> {
        if !self.monitoring_enabled {
            return Ok(());
        }
        if self.cumulative.is_some() {
            return Err(BackendError::UploaderAlreadyRunning(
                self.uploader_name(UploaderKind::Cumulative),
            ));
        }
        self.cumulative = Some(self.spawn(Report::Cumulative)?);
        Ok(())
    }

    fn stop_goodput_uploader(&mut self) -> BackendResult<()> {
        if !self.monitoring_enabled {
            return Ok(());
        }
        let uploader = self.cumulative.take().ok_or_else(|| {
            BackendError::UploaderNotRunning(self.uploader_name(UploaderKind::Cumulative))
        })?;
        self.stop(uploader)
    }

    fn start_rolling_window_goodput_uploader(&mut self, window_sizes: &[u32]) -> BackendResult<()> {
        if !self.monitoring_enabled {
            return Ok(());
        }
        if self.rolling.is_some() {
            return Err(BackendError::UploaderAlreadyRunning(
                self.uploader_name(UploaderKind::RollingWindow),
            ));
        }
        self.rolling = Some(self.spawn(Report::RollingWindow(window_sizes.to_vec()))?);
        Ok(())
    }

    fn stop_rolling_window_goodput_uploader(&mut self) -> BackendResult<()> {
        if !self.monitoring_enabled {
            return Ok(());
        }
        let uploader = self.rolling.take().ok_or_else(|| {
            BackendError::UploaderNotRunning(self.uploader_name(UploaderKind::RollingWindow))
        })?;
        self.stop(uploader)
    }
}

impl Drop for LocalMonitor {
    fn drop(&mut self) {
        for uploader in [self.cumulative.take(), self.rolling.take()].into_iter().flatten() {
            uploader.handle.abort();
        }
    }
}
