mod error;
mod recorder;
mod scope;

pub use error::{RecorderError, RecorderResult};
pub use recorder::GoodputRecorder;
pub use scope::{EventScope, MonitorGroup, MonitorScope};
