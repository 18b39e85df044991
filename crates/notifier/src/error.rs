use roundwatch_common::error::AppError;
use thiserror::Error;

/// Failures raised by the extended queue client and its transports.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("message body cannot be empty")]
    EmptyBody,

    #[error("message has {count} attributes, the queue accepts at most {max}")]
    TooManyAttributes { count: usize, max: usize },

    #[error("invalid message attribute: {0}")]
    InvalidAttribute(String),

    #[error("blob store error: {0}")]
    BlobStore(String),

    #[error("queue transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        AppError::QueueSubmit(err.to_string())
    }
}
