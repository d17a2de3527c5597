//! Monitoring backend seam
//!
//! The recorder talks to the goodput monitoring library only through the
//! traits in `types`. `local` provides an in-process implementation that
//! computes goodput from recorded events and writes JSON summaries.

pub mod error;
pub mod goodput;
pub mod local;
pub mod types;

pub use error::{BackendError, BackendResult};
pub use goodput::{EventLog, GoodputSummary, RollingWindowGoodput, RollingWindowReport};
pub use local::{LocalBackend, LocalMonitor, GOODPUT_FILE, ROLLING_WINDOW_FILE};
pub use types::{EventTimer, GcpOptions, GoodputMonitor, MonitorOptions, MonitoringBackend};
