use thiserror::Error;

/// Common error types used across the scanner.
///
/// Every variant except `Internal` is recoverable at some granularity: the
/// scan loop logs it and moves on to the next fund, round, event or recipient.
#[derive(Debug, Error)]
pub enum AppError {
    /// Reading funds, rounds, events, applications or accounts failed.
    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(String),

    /// Queue or blob-store submission failed.
    #[error("Queue submit error: {0}")]
    QueueSubmit(String),

    /// Writing a `reminder_sent` / `processed` flag back upstream failed.
    #[error("State update error: {0}")]
    StateUpdate(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(String),
}
