//! Recorder configuration
//!
//! Two ways in, one validation path:
//! - flat `key=value` spec lists (`RecorderConfig::from_spec`, `RecorderFlags`)
//! - the structured `RecorderConfigBuilder` (and JSON through serde)

pub mod error;
pub mod flags;
pub mod spec;
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use flags::RecorderFlags;
pub use spec::{parse_window_sizes, SPEC_KEYS};
pub use types::{RecorderConfig, RecorderConfigBuilder, PROXY_BACKEND};
