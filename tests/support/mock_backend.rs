//! Monitoring backend that records every call it receives

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use goodput_recorder::backend::{
    BackendError, BackendResult, EventTimer, GoodputMonitor, MonitorOptions, MonitoringBackend,
};
use goodput_recorder::Event;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateEventTimer { job_name: String, logger_name: String },
    RecordStart(Event),
    RecordEnd(Event),
    CreateMonitor(MonitorOptions),
    StartGoodput,
    StopGoodput,
    StartRollingWindow(Vec<u32>),
    StopRollingWindow,
}

/// Which backend operation should fail
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub create_monitor: bool,
    pub start: bool,
    pub start_rolling_window: bool,
    pub stop: bool,
    pub record: bool,
}

#[derive(Clone, Default)]
pub struct RecordingBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    failures: Failures,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: Failures) -> Self {
        Self {
            calls: Arc::default(),
            failures,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn monitors_created(&self) -> Vec<MonitorOptions> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateMonitor(options) => Some(options),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, expected: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == expected).count()
    }

    fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl MonitoringBackend for RecordingBackend {
    fn event_timer(&self, job_name: &str, logger_name: &str) -> BackendResult<Box<dyn EventTimer>> {
        self.push(Call::CreateEventTimer {
            job_name: job_name.to_string(),
            logger_name: logger_name.to_string(),
        });
        Ok(Box::new(RecordingHandle {
            backend: self.clone(),
        }))
    }

    fn goodput_monitor(&self, options: &MonitorOptions) -> BackendResult<Box<dyn GoodputMonitor>> {
        self.push(Call::CreateMonitor(options.clone()));
        if self.failures.create_monitor {
            return Err(BackendError::UnsupportedDestination(options.upload_dir.clone()));
        }
        Ok(Box::new(RecordingHandle {
            backend: self.clone(),
        }))
    }
}

struct RecordingHandle {
    backend: RecordingBackend,
}

impl RecordingHandle {
    fn outcome(&self, call: Call, fail: bool) -> BackendResult<()> {
        self.backend.push(call);
        if fail {
            Err(BackendError::UploaderNotRunning("mock failure".into()))
        } else {
            Ok(())
        }
    }
}

impl EventTimer for RecordingHandle {
    fn record_start(&mut self, event: Event, _at: DateTime<Utc>) -> BackendResult<()> {
        self.outcome(Call::RecordStart(event), self.backend.failures.record)
    }

    fn record_end(&mut self, event: Event, _at: DateTime<Utc>) -> BackendResult<()> {
        self.outcome(Call::RecordEnd(event), self.backend.failures.record)
    }
}

impl GoodputMonitor for RecordingHandle {
    fn start_goodput_uploader(&mut self) -> BackendResult<()> {
        self.outcome(Call::StartGoodput, self.backend.failures.start)
    }

    fn stop_goodput_uploader(&mut self) -> BackendResult<()> {
        self.outcome(Call::StopGoodput, self.backend.failures.stop)
    }

    fn start_rolling_window_goodput_uploader(&mut self, window_sizes: &[u32]) -> BackendResult<()> {
        self.outcome(
            Call::StartRollingWindow(window_sizes.to_vec()),
            self.backend.failures.start_rolling_window,
        )
    }

    fn stop_rolling_window_goodput_uploader(&mut self) -> BackendResult<()> {
        self.outcome(Call::StopRollingWindow, self.backend.failures.stop)
    }
}
