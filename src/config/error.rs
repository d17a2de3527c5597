use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required field missing: {0}")]
    RequiredFieldMissing(String),

    #[error("Unknown recorder spec key: {0}")]
    UnknownKey(String),

    #[error("Malformed recorder spec entry (expected key=value): {0}")]
    MalformedEntry(String),

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serialization(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
