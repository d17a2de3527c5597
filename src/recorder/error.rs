use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Backend error: {0}")]
    BackendError(#[from] crate::backend::BackendError),

    #[error("Unknown recorder type: {0}")]
    UnknownRecorderType(String),

    #[error("Recorder already initialized")]
    AlreadyInitialized,
}

pub type RecorderResult<T> = Result<T, RecorderError>;
