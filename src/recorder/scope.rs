use crate::backend::{EventTimer, GoodputMonitor};
use crate::measurement::Event;
use crate::metrics::UploaderKind;
use crate::recorder::error::RecorderResult;
use chrono::Utc;
use parking_lot::Mutex;

pub(crate) type TimerSlot = Mutex<Option<Box<dyn EventTimer>>>;

/// Guard for an open event; records the end timestamp when dropped.
///
/// Inactive on non-coordinator processes, where dropping does nothing.
#[must_use = "the event ends as soon as the scope is dropped"]
pub struct EventScope<'a> {
    event: Event,
    timer: Option<&'a TimerSlot>,
}

impl<'a> EventScope<'a> {
    pub(crate) fn active(event: Event, timer: &'a TimerSlot) -> Self {
        Self {
            event,
            timer: Some(timer),
        }
    }

    pub(crate) fn inactive(event: Event) -> Self {
        Self { event, timer: None }
    }

    pub fn event(&self) -> Event {
        self.event
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }
}

impl Drop for EventScope<'_> {
    fn drop(&mut self) {
        let Some(slot) = self.timer else {
            return;
        };
        if let Some(timer) = slot.lock().as_mut() {
            if let Err(e) = timer.record_end(self.event, Utc::now()) {
                tracing::warn!("Failed to record {} end time: {}", self.event, e);
            }
        }
    }
}

/// Guard for a running uploader; stops it exactly once.
///
/// Prefer [`MonitorScope::finish`] to observe stop errors; a plain drop
/// still stops the uploader but can only log the failure.
#[must_use = "the uploader stops as soon as the scope is dropped"]
pub struct MonitorScope {
    running: Option<(Box<dyn GoodputMonitor>, UploaderKind)>,
    job_name: String,
}

impl MonitorScope {
    pub(crate) fn inactive(job_name: &str) -> Self {
        Self {
            running: None,
            job_name: job_name.to_string(),
        }
    }

    /// Start the uploader of `kind`. Nothing is stopped if starting fails.
    pub(crate) fn start(
        mut monitor: Box<dyn GoodputMonitor>,
        kind: UploaderKind,
        window_sizes: &[u32],
        job_name: &str,
    ) -> RecorderResult<Self> {
        match kind {
            UploaderKind::Cumulative => monitor.start_goodput_uploader()?,
            UploaderKind::RollingWindow => {
                monitor.start_rolling_window_goodput_uploader(window_sizes)?
            }
        }
        tracing::info!("{} goodput monitoring started for {}", kind.as_str(), job_name);

        Ok(Self {
            running: Some((monitor, kind)),
            job_name: job_name.to_string(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn kind(&self) -> Option<UploaderKind> {
        self.running.as_ref().map(|(_, kind)| *kind)
    }

    /// Stop the uploader now and report the outcome.
    pub fn finish(mut self) -> RecorderResult<()> {
        self.stop()
    }

    fn stop(&mut self) -> RecorderResult<()> {
        let Some((mut monitor, kind)) = self.running.take() else {
            return Ok(());
        };
        match kind {
            UploaderKind::Cumulative => monitor.stop_goodput_uploader()?,
            UploaderKind::RollingWindow => monitor.stop_rolling_window_goodput_uploader()?,
        }
        tracing::info!(
            "{} goodput monitoring stopped for {}",
            kind.as_str(),
            self.job_name
        );
        Ok(())
    }
}

impl Drop for MonitorScope {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(
                "Failed to stop goodput uploader for {}: {}",
                self.job_name,
                e
            );
        }
    }
}

/// Cumulative and rolling-window scopes opened together.
///
/// The rolling-window uploader is stopped first.
#[must_use = "the uploaders stop as soon as the group is dropped"]
pub struct MonitorGroup {
    // Field order is drop order
    rolling_window: MonitorScope,
    cumulative: MonitorScope,
}

impl MonitorGroup {
    pub(crate) fn new(cumulative: MonitorScope, rolling_window: MonitorScope) -> Self {
        Self {
            rolling_window,
            cumulative,
        }
    }

    pub fn cumulative(&self) -> &MonitorScope {
        &self.cumulative
    }

    pub fn rolling_window(&self) -> &MonitorScope {
        &self.rolling_window
    }

    /// Stop both uploaders, returning the first error.
    pub fn finish(self) -> RecorderResult<()> {
        let Self {
            rolling_window,
            cumulative,
        } = self;
        let rolling = rolling_window.finish();
        let cumulative = cumulative.finish();
        rolling.and(cumulative)
    }
}
