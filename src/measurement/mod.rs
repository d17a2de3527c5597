//! Job events and the process-wide recorder
//!
//! Training code marks phases with `measurement::record_event(Event::...)`
//! after `measurement::initialize` installed a recorder from flags; with no
//! recorder installed these calls are no-ops.

pub mod registry;
pub mod types;

pub use registry::{
    global_recorder, initialize, record_event, recorder_from_flags, GOODPUT_RECORDER_TYPE,
};
pub use types::Event;
