use std::collections::HashMap;

use async_trait::async_trait;

use crate::attributes::MessageAttribute;
use crate::error::QueueError;

/// A fully prepared queue send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendMessageRequest {
    pub queue_url: String,
    pub body: String,
    pub attributes: HashMap<String, MessageAttribute>,
    pub group_id: String,
    pub deduplication_id: String,
}

/// The message queue the client submits to.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Send one message and return the queue-assigned message id.
    async fn send_message(&self, request: SendMessageRequest) -> Result<String, QueueError>;
}

/// Blob storage receiving offloaded message bodies.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), QueueError>;
}
