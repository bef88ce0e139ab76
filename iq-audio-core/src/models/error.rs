use thiserror::Error;

/// Errors that can occur while driving an SDR audio session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("device not available")]
    DeviceNotAvailable,

    #[error("device failed: {0}")]
    DeviceFailed(String),

    #[error("invalid session parameters: {0}")]
    InvalidParameters(String),

    #[error("file source failed: {0}")]
    FileFailed(String),

    #[error("stream failed: {0}")]
    StreamFailed(String),
}
