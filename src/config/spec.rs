//! Flat `key=value` recorder spec parsing.

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::types::{RecorderConfig, RecorderConfigBuilder};

/// Keys accepted in a recorder spec.
pub const SPEC_KEYS: &[&str] = &[
    "name",
    "upload_dir",
    "upload_interval",
    "rolling_window_size",
    "enable_rolling_window_goodput_monitoring",
    "enable_gcp_goodput_metrics",
    "enable_pathways_goodput",
    "include_badput_breakdown",
];

impl RecorderConfig {
    /// Decode a spec such as `["name=job", "upload_dir=/out", "upload_interval=15"]`.
    ///
    /// Later entries override earlier ones for the same key.
    pub fn from_spec<I, S>(spec: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = RecorderConfigBuilder::new();
        for entry in spec {
            builder.apply_spec_entry(entry.as_ref())?;
        }
        builder.build()
    }
}

impl RecorderConfigBuilder {
    /// Apply a single `key=value` entry.
    pub fn apply_spec_entry(&mut self, entry: &str) -> ConfigResult<()> {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedEntry(entry.to_string()))?;
        let key = key.trim();
        let value = value.trim();

        match key {
            "name" => self.name = Some(value.to_string()),
            "upload_dir" => self.upload_dir = Some(value.to_string()),
            "upload_interval" => {
                self.upload_interval = Some(value.parse().map_err(|e| ConfigError::InvalidValue {
                    field: key.to_string(),
                    value: value.to_string(),
                    reason: format!("{e}"),
                })?)
            }
            "rolling_window_size" => self.rolling_window_size = parse_window_sizes(value)?,
            "enable_rolling_window_goodput_monitoring" => {
                self.enable_rolling_window_goodput_monitoring = Some(parse_bool(key, value)?)
            }
            "enable_gcp_goodput_metrics" => {
                self.enable_gcp_goodput_metrics = parse_bool(key, value)?
            }
            "enable_pathways_goodput" => {
                self.enable_pathways_goodput = Some(parse_bool(key, value)?)
            }
            "include_badput_breakdown" => self.include_badput_breakdown = parse_bool(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        Ok(())
    }
}

/// Parse comma-separated window sizes; an empty value yields no windows.
///
/// Empty items inside a non-empty list are rejected.
pub fn parse_window_sizes(value: &str) -> ConfigResult<Vec<u32>> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }

    value
        .split(',')
        .map(str::trim)
        .map(|part| {
            if part.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "rolling_window_size".into(),
                    value: value.to_string(),
                    reason: "empty window size".into(),
                });
            }
            part.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                field: "rolling_window_size".into(),
                value: value.to_string(),
                reason: format!("{part:?}: {e}"),
            })
        })
        .collect()
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}
