use crate::config::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix of the logger name shared by the event timer and the uploaders.
pub const LOGGER_NAME_PREFIX: &str = "goodput_logger_";

/// Directory prefix for rolling-window uploads, relative to `upload_dir`.
pub const ROLLING_WINDOW_DIR_PREFIX: &str = "rolling_window_";

/// Validated recorder configuration.
///
/// Built either from a flat `key=value` spec ([`RecorderConfig::from_spec`])
/// or through [`RecorderConfigBuilder`]. Both paths end in
/// [`RecorderConfigBuilder::build`], so defaults and validation agree.
/// Fields are read through accessors; a config cannot exist unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecorderConfig {
    /// Job name, also used to derive logger and rolling-window names
    name: String,

    /// Destination for uploaded goodput summaries (path or URI)
    upload_dir: String,

    /// Seconds between uploads
    upload_interval: u64,

    /// Rolling window lengths, in steps
    rolling_window_size: Vec<u32>,

    /// Explicit rolling-window toggle; `None` derives it from `rolling_window_size`
    enable_rolling_window_goodput_monitoring: Option<bool>,

    /// Attach GCP monitoring options to the uploader
    enable_gcp_goodput_metrics: bool,

    /// Explicit pathways toggle; `None` derives it from the accelerator backend
    enable_pathways_goodput: Option<bool>,

    /// Upload per-category badput alongside goodput
    include_badput_breakdown: bool,
}

impl RecorderConfig {
    pub fn builder() -> RecorderConfigBuilder {
        RecorderConfigBuilder::new()
    }

    /// Parse a JSON document with the same fields as the spec keys.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let builder: RecorderConfigBuilder = serde_json::from_str(json)?;
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn upload_dir(&self) -> &str {
        &self.upload_dir
    }

    pub fn upload_interval(&self) -> u64 {
        self.upload_interval
    }

    pub fn rolling_window_size(&self) -> &[u32] {
        &self.rolling_window_size
    }

    pub fn enable_rolling_window_goodput_monitoring(&self) -> Option<bool> {
        self.enable_rolling_window_goodput_monitoring
    }

    pub fn enable_gcp_goodput_metrics(&self) -> bool {
        self.enable_gcp_goodput_metrics
    }

    pub fn enable_pathways_goodput(&self) -> Option<bool> {
        self.enable_pathways_goodput
    }

    pub fn include_badput_breakdown(&self) -> bool {
        self.include_badput_breakdown
    }

    pub fn logger_name(&self) -> String {
        format!("{}{}", LOGGER_NAME_PREFIX, self.name)
    }

    pub fn rolling_window_upload_dir(&self) -> String {
        format!(
            "{}/{}{}",
            self.upload_dir, ROLLING_WINDOW_DIR_PREFIX, self.name
        )
    }

    pub fn upload_interval_duration(&self) -> Duration {
        Duration::from_secs(self.upload_interval)
    }

    /// Whether rolling-window monitoring should run.
    ///
    /// An explicit toggle wins over the derived value, but a window size
    /// sequence is always required.
    pub fn rolling_window_enabled(&self) -> bool {
        if self.rolling_window_size.is_empty() {
            return false;
        }
        self.enable_rolling_window_goodput_monitoring.unwrap_or(true)
    }

    /// Resolve pathways mode against the accelerator backend kind.
    pub fn pathways_enabled(&self, backend_kind: Option<&str>) -> bool {
        self.enable_pathways_goodput
            .unwrap_or_else(|| backend_kind == Some(PROXY_BACKEND))
    }
}

/// Backend kind reported by pathways (proxy) deployments.
pub const PROXY_BACKEND: &str = "proxy";

/// Structured builder for [`RecorderConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfigBuilder {
    pub(crate) name: Option<String>,
    pub(crate) upload_dir: Option<String>,
    pub(crate) upload_interval: Option<u64>,
    pub(crate) rolling_window_size: Vec<u32>,
    pub(crate) enable_rolling_window_goodput_monitoring: Option<bool>,
    pub(crate) enable_gcp_goodput_metrics: bool,
    pub(crate) enable_pathways_goodput: Option<bool>,
    pub(crate) include_badput_breakdown: bool,
}

impl Default for RecorderConfigBuilder {
    fn default() -> Self {
        Self {
            name: None,
            upload_dir: None,
            upload_interval: None,
            rolling_window_size: Vec::new(),
            enable_rolling_window_goodput_monitoring: None,
            enable_gcp_goodput_metrics: false,
            enable_pathways_goodput: None,
            include_badput_breakdown: true,
        }
    }
}

impl RecorderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<String>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    pub fn upload_interval(mut self, seconds: u64) -> Self {
        self.upload_interval = Some(seconds);
        self
    }

    pub fn rolling_window_size(mut self, sizes: impl Into<Vec<u32>>) -> Self {
        self.rolling_window_size = sizes.into();
        self
    }

    pub fn enable_rolling_window_goodput_monitoring(mut self, enabled: bool) -> Self {
        self.enable_rolling_window_goodput_monitoring = Some(enabled);
        self
    }

    pub fn enable_gcp_goodput_metrics(mut self, enabled: bool) -> Self {
        self.enable_gcp_goodput_metrics = enabled;
        self
    }

    pub fn enable_pathways_goodput(mut self, enabled: bool) -> Self {
        self.enable_pathways_goodput = Some(enabled);
        self
    }

    pub fn include_badput_breakdown(mut self, enabled: bool) -> Self {
        self.include_badput_breakdown = enabled;
        self
    }

    /// Validate and produce the final config.
    ///
    /// Required fields are checked in the order name, upload_dir,
    /// upload_interval; the first missing one is reported.
    pub fn build(self) -> ConfigResult<RecorderConfig> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ConfigError::RequiredFieldMissing("name".into()))?;
        let upload_dir = self
            .upload_dir
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ConfigError::RequiredFieldMissing("upload_dir".into()))?;
        let upload_interval = self
            .upload_interval
            .ok_or_else(|| ConfigError::RequiredFieldMissing("upload_interval".into()))?;

        if upload_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "upload_interval".into(),
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        if self.rolling_window_size.contains(&0) {
            return Err(ConfigError::InvalidValue {
                field: "rolling_window_size".into(),
                value: format!("{:?}", self.rolling_window_size),
                reason: "window sizes must be greater than zero".into(),
            });
        }

        Ok(RecorderConfig {
            name,
            upload_dir,
            upload_interval,
            rolling_window_size: self.rolling_window_size,
            enable_rolling_window_goodput_monitoring: self
                .enable_rolling_window_goodput_monitoring,
            enable_gcp_goodput_metrics: self.enable_gcp_goodput_metrics,
            enable_pathways_goodput: self.enable_pathways_goodput,
            include_badput_breakdown: self.include_badput_breakdown,
        })
    }
}
