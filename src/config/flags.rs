use crate::config::error::ConfigResult;
use crate::config::types::RecorderConfig;
use clap::Args;

/// Recorder selection flags shared by every process of a job.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RecorderFlags {
    /// Recorder implementation to install (e.g. "goodput")
    #[arg(long = "recorder_type")]
    pub recorder_type: Option<String>,

    /// Recorder spec entries as key=value; repeat the flag for each entry
    #[arg(long = "recorder_spec")]
    pub recorder_spec: Vec<String>,

    /// Accelerator backend of this process ("tpu", "gpu", "proxy", ...)
    #[arg(long = "jax_backend")]
    pub jax_backend: Option<String>,
}

impl RecorderFlags {
    pub fn recorder_config(&self) -> ConfigResult<RecorderConfig> {
        RecorderConfig::from_spec(&self.recorder_spec)
    }
}
