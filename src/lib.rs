//! Goodput measurement for distributed training jobs.
//!
//! A [`GoodputRecorder`] is built on every process from a `key=value` spec;
//! the coordinator process times job events and runs goodput uploaders
//! through a [`MonitoringBackend`](backend::MonitoringBackend).

pub mod backend;
pub mod config;
pub mod environment;
pub mod measurement;
pub mod metrics;
pub mod recorder;

pub use config::{ConfigError, RecorderConfig, RecorderFlags};
pub use environment::{JobEnvironment, StaticEnvironment};
pub use measurement::Event;
pub use recorder::{EventScope, GoodputRecorder, MonitorGroup, MonitorScope, RecorderError};
