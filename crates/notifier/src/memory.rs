//! In-memory queue and blob store for tests and local dry runs.
//!
//! Both record everything they receive and can be configured to fail, so
//! callers can exercise partial-failure paths without AWS.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::QueueError;
use crate::transport::{BlobStore, QueueTransport, SendMessageRequest};

fn poison_err<T>(_: PoisonError<T>) -> QueueError {
    QueueError::Transport("in-memory lock poisoned".to_string())
}

/// Which sends an [`InMemoryQueue`] rejects.
#[derive(Debug, Clone, Default)]
enum FailurePolicy {
    #[default]
    Never,
    Always,
    /// Reject bodies containing this needle.
    BodyContains(String),
}

/// Recording queue transport.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    sent: Mutex<Vec<(String, SendMessageRequest)>>,
    failures: FailurePolicy,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that rejects every send.
    pub fn unavailable() -> Self {
        Self {
            failures: FailurePolicy::Always,
            ..Self::default()
        }
    }

    /// A queue that rejects any body containing `needle`.
    pub fn failing_on(needle: impl Into<String>) -> Self {
        Self {
            failures: FailurePolicy::BodyContains(needle.into()),
            ..Self::default()
        }
    }

    /// Accepted messages, in send order.
    pub fn messages(&self) -> Vec<SendMessageRequest> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|(_, req)| req.clone()).collect())
            .unwrap_or_default()
    }

    /// Ids assigned to accepted messages, in send order.
    pub fn message_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueue {
    async fn send_message(&self, request: SendMessageRequest) -> Result<String, QueueError> {
        let rejected = match &self.failures {
            FailurePolicy::Never => false,
            FailurePolicy::Always => true,
            FailurePolicy::BodyContains(needle) => request.body.contains(needle.as_str()),
        };
        if rejected {
            return Err(QueueError::Transport(format!(
                "queue rejected message for {}",
                request.queue_url
            )));
        }

        let message_id = Uuid::new_v4().to_string();
        self.sent
            .lock()
            .map_err(poison_err)?
            .push((message_id.clone(), request));
        Ok(message_id)
    }
}

/// Recording blob store keyed by `(bucket, key)`.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    unavailable: bool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .ok()?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys of every stored object.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.keys().map(|(_, key)| key.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), QueueError> {
        if self.unavailable {
            return Err(QueueError::BlobStore(format!("bucket {bucket} unavailable")));
        }
        self.objects
            .lock()
            .map_err(poison_err)?
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}
