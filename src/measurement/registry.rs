//! Process-wide recorder installed from flags.

use crate::backend::MonitoringBackend;
use crate::config::RecorderFlags;
use crate::environment::JobEnvironment;
use crate::measurement::types::Event;
use crate::recorder::{EventScope, GoodputRecorder, RecorderError, RecorderResult};
use std::sync::{Arc, OnceLock};

/// `--recorder_type` value selecting [`GoodputRecorder`].
pub const GOODPUT_RECORDER_TYPE: &str = "goodput";

/// Global recorder
static GLOBAL_RECORDER: OnceLock<GoodputRecorder> = OnceLock::new();

/// Build a recorder for `flags` without installing it.
///
/// Returns `Ok(None)` when no recorder type was requested.
pub fn recorder_from_flags(
    flags: &RecorderFlags,
    backend: Arc<dyn MonitoringBackend>,
    environment: Arc<dyn JobEnvironment>,
) -> RecorderResult<Option<GoodputRecorder>> {
    match flags.recorder_type.as_deref() {
        None => Ok(None),
        Some(GOODPUT_RECORDER_TYPE) => {
            GoodputRecorder::from_flags(flags, backend, environment).map(Some)
        }
        Some(other) => Err(RecorderError::UnknownRecorderType(other.to_string())),
    }
}

/// Install the global recorder selected by `--recorder_type`.
///
/// Returns whether a recorder was installed. Can only succeed once per
/// process.
pub fn initialize(
    flags: &RecorderFlags,
    backend: Arc<dyn MonitoringBackend>,
    environment: Arc<dyn JobEnvironment>,
) -> RecorderResult<bool> {
    if GLOBAL_RECORDER.get().is_some() {
        return Err(RecorderError::AlreadyInitialized);
    }

    let Some(recorder) = recorder_from_flags(flags, backend, environment)? else {
        tracing::info!("No recorder type specified; measurement disabled");
        return Ok(false);
    };

    let name = recorder.config().name().to_string();
    GLOBAL_RECORDER
        .set(recorder)
        .map_err(|_| RecorderError::AlreadyInitialized)?;
    tracing::info!("Initialized goodput recorder for {}", name);
    Ok(true)
}

/// The installed recorder, if any
pub fn global_recorder() -> Option<&'static GoodputRecorder> {
    GLOBAL_RECORDER.get()
}

/// Record `event` on the global recorder; `None` when none is installed.
pub fn record_event(event: Event) -> RecorderResult<Option<EventScope<'static>>> {
    match GLOBAL_RECORDER.get() {
        Some(recorder) => recorder.record_event(event).map(Some),
        None => Ok(None),
    }
}
