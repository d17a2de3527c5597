use crate::backend::{GcpOptions, MonitorOptions, MonitoringBackend};
use crate::config::{RecorderConfig, RecorderFlags};
use crate::environment::JobEnvironment;
use crate::measurement::Event;
use crate::metrics::UploaderKind;
use crate::recorder::error::RecorderResult;
use crate::recorder::scope::{EventScope, MonitorGroup, MonitorScope, TimerSlot};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;

/// Goodput recorder for one process of a training job.
///
/// Every process builds the same recorder; only the coordinator (process 0)
/// records events and runs uploaders. Everywhere else the scopes it hands
/// out are inert.
pub struct GoodputRecorder {
    config: RecorderConfig,
    backend: Arc<dyn MonitoringBackend>,
    environment: Arc<dyn JobEnvironment>,

    // Created on the first recorded event, then reused
    event_timer: TimerSlot,
}

impl GoodputRecorder {
    pub fn new(
        config: RecorderConfig,
        backend: Arc<dyn MonitoringBackend>,
        environment: Arc<dyn JobEnvironment>,
    ) -> Self {
        Self {
            config,
            backend,
            environment,
            event_timer: Mutex::new(None),
        }
    }

    /// Build from `key=value` spec entries.
    pub fn from_spec<I, S>(
        spec: I,
        backend: Arc<dyn MonitoringBackend>,
        environment: Arc<dyn JobEnvironment>,
    ) -> RecorderResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let config = RecorderConfig::from_spec(spec)?;
        Ok(Self::new(config, backend, environment))
    }

    /// Build from `--recorder_spec`.
    pub fn from_flags(
        flags: &RecorderFlags,
        backend: Arc<dyn MonitoringBackend>,
        environment: Arc<dyn JobEnvironment>,
    ) -> RecorderResult<Self> {
        Self::from_spec(&flags.recorder_spec, backend, environment)
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn is_coordinator(&self) -> bool {
        self.environment.is_coordinator()
    }

    /// Open a timing scope for `event`.
    ///
    /// The start timestamp is recorded now and the end timestamp when the
    /// returned scope drops, including during unwinding. Failing to create
    /// the event timer is an error; failing to record a timestamp is logged.
    pub fn record_event(&self, event: Event) -> RecorderResult<EventScope<'_>> {
        if !self.is_coordinator() {
            tracing::debug!(
                "Skipping {} timing on process {}",
                event,
                self.environment.process_index()
            );
            return Ok(EventScope::inactive(event));
        }

        let mut slot = self.event_timer.lock();
        if slot.is_none() {
            let timer = self
                .backend
                .event_timer(self.config.name(), &self.config.logger_name())?;
            *slot = Some(timer);
        }
        if let Some(timer) = slot.as_mut() {
            if let Err(e) = timer.record_start(event, Utc::now()) {
                tracing::warn!("Failed to record {} start time: {}", event, e);
            }
        }
        drop(slot);

        Ok(EventScope::active(event, &self.event_timer))
    }

    /// Run `f` inside an [`EventScope`] for `event`.
    pub fn with_event<T>(&self, event: Event, f: impl FnOnce() -> T) -> RecorderResult<T> {
        let _scope = self.record_event(event)?;
        Ok(f())
    }

    /// Options for an uploader writing to `upload_dir`.
    pub fn monitor_options(&self, upload_dir: String) -> MonitorOptions {
        let backend_kind = self.environment.backend_kind();
        MonitorOptions {
            job_name: self.config.name().to_string(),
            logger_name: self.config.logger_name(),
            upload_dir,
            upload_interval: self.config.upload_interval(),
            monitoring_enabled: true,
            pathway_enabled: self.config.pathways_enabled(backend_kind.as_deref()),
            include_badput_breakdown: self.config.include_badput_breakdown(),
            gcp_options: self.config.enable_gcp_goodput_metrics().then(|| GcpOptions {
                enable_gcp_goodput_metrics: true,
                enable_gcp_step_deviation_metrics: false,
            }),
        }
    }

    /// Run the cumulative goodput uploader for the lifetime of the scope.
    pub fn maybe_monitor_goodput(&self) -> RecorderResult<MonitorScope> {
        if !self.is_coordinator() {
            tracing::debug!(
                "Skipping goodput monitoring on process {}",
                self.environment.process_index()
            );
            return Ok(MonitorScope::inactive(self.config.name()));
        }

        let options = self.monitor_options(self.config.upload_dir().to_string());
        let monitor = self.backend.goodput_monitor(&options)?;
        MonitorScope::start(monitor, UploaderKind::Cumulative, &[], self.config.name())
    }

    /// Run the rolling-window uploader for the lifetime of the scope.
    ///
    /// Inert unless rolling-window monitoring is enabled with at least one
    /// window size.
    pub fn maybe_monitor_rolling_window_goodput(&self) -> RecorderResult<MonitorScope> {
        if !self.config.rolling_window_enabled() {
            tracing::debug!(
                "Rolling window goodput monitoring disabled for {}",
                self.config.name()
            );
            return Ok(MonitorScope::inactive(self.config.name()));
        }
        if !self.is_coordinator() {
            tracing::debug!(
                "Skipping rolling window goodput monitoring on process {}",
                self.environment.process_index()
            );
            return Ok(MonitorScope::inactive(self.config.name()));
        }

        let options = self.monitor_options(self.config.rolling_window_upload_dir());
        let monitor = self.backend.goodput_monitor(&options)?;
        MonitorScope::start(
            monitor,
            UploaderKind::RollingWindow,
            self.config.rolling_window_size(),
            self.config.name(),
        )
    }

    /// Open both uploader scopes. If the rolling-window uploader fails to
    /// start, the already running cumulative uploader is stopped.
    pub fn maybe_monitor_all_goodput(&self) -> RecorderResult<MonitorGroup> {
        let cumulative = self.maybe_monitor_goodput()?;
        let rolling_window = self.maybe_monitor_rolling_window_goodput()?;
        Ok(MonitorGroup::new(cumulative, rolling_window))
    }
}
