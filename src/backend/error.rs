use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unsupported upload destination: {0}")]
    UnsupportedDestination(String),

    #[error("Uploader requires a running tokio runtime")]
    NoRuntime,

    #[error("Uploader already running: {0}")]
    UploaderAlreadyRunning(String),

    #[error("Uploader not running: {0}")]
    UploaderNotRunning(String),

    #[error("Event {0} ended without a matching start")]
    EventNotStarted(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
