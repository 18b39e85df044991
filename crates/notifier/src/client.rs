//! Queue client with transparent blob offload for oversized bodies.
//!
//! Submission steps:
//! 1. Reject empty bodies and caller attributes using reserved names
//! 2. Assemble attributes (`message_created_at`, optional `ExtendedPayloadSize`, caller attributes)
//! 3. If offload applies, write the body to blob storage and swap in a pointer body
//! 4. Send with the caller's group id and a fresh deduplication id

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use roundwatch_common::config::{AppConfig, DEFAULT_MESSAGE_SIZE_THRESHOLD};

use crate::attributes::{
    MAX_MESSAGE_ATTRIBUTES, MESSAGE_CREATED_AT, MessageAttribute, RESERVED_ATTRIBUTE_NAME,
    S3_KEY_ATTRIBUTE_NAME,
};
use crate::error::QueueError;
use crate::pointer::OffloadPointer;
use crate::transport::{BlobStore, QueueTransport, SendMessageRequest};

/// When and where message bodies are offloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffloadConfig {
    /// Target bucket. Offload is disabled entirely when `None`.
    pub bucket: Option<String>,
    /// Bodies strictly larger than this many bytes are offloaded.
    pub threshold: usize,
    /// Offload every body regardless of size.
    pub always: bool,
}

impl OffloadConfig {
    pub fn disabled() -> Self {
        Self {
            bucket: None,
            threshold: DEFAULT_MESSAGE_SIZE_THRESHOLD,
            always: false,
        }
    }

    pub fn to_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            ..Self::disabled()
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bucket: config.aws_msg_bucket_name.clone(),
            threshold: config.message_size_threshold,
            always: config.always_through_s3,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn always_through_s3(mut self) -> Self {
        self.always = true;
        self
    }

    /// The bucket to offload a body of `encoded_size` bytes to, if any.
    pub fn target_bucket(&self, encoded_size: usize) -> Option<&str> {
        self.bucket
            .as_deref()
            .filter(|_| self.always || encoded_size > self.threshold)
    }
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Queue client that offloads large bodies to blob storage.
#[derive(Clone)]
pub struct ExtendedQueueClient {
    queue: Arc<dyn QueueTransport>,
    blobs: Arc<dyn BlobStore>,
    offload: OffloadConfig,
}

impl ExtendedQueueClient {
    pub fn new(
        queue: Arc<dyn QueueTransport>,
        blobs: Arc<dyn BlobStore>,
        offload: OffloadConfig,
    ) -> Self {
        Self {
            queue,
            blobs,
            offload,
        }
    }

    /// Submit one message and return the queue-assigned message id.
    ///
    /// `group_id` orders all messages of one notification kind. The
    /// deduplication id is random per call: retries of the same payload are
    /// distinct sends, not replays.
    pub async fn submit(
        &self,
        queue_url: &str,
        body: &str,
        group_id: &str,
        attributes: HashMap<String, MessageAttribute>,
    ) -> Result<String, QueueError> {
        if body.is_empty() {
            tracing::error!(queue_url, "Refusing to submit an empty message body");
            return Err(QueueError::EmptyBody);
        }

        if let Some(name) = attributes
            .keys()
            .find(|name| *name == MESSAGE_CREATED_AT || *name == RESERVED_ATTRIBUTE_NAME)
        {
            return Err(QueueError::InvalidAttribute(format!(
                "{name} is set by the client and cannot be supplied"
            )));
        }

        let encoded_size = body.len();
        let bucket = self.offload.target_bucket(encoded_size);

        let mut message_attributes = HashMap::new();
        message_attributes.insert(
            MESSAGE_CREATED_AT.to_string(),
            MessageAttribute::string(Utc::now().to_rfc3339()),
        );
        if bucket.is_some() {
            message_attributes.insert(
                RESERVED_ATTRIBUTE_NAME.to_string(),
                MessageAttribute::number(encoded_size),
            );
        }
        let s3_key = bucket.map(|_| Self::s3_key(&attributes)).transpose()?;
        message_attributes.extend(attributes);

        if message_attributes.len() > MAX_MESSAGE_ATTRIBUTES {
            return Err(QueueError::TooManyAttributes {
                count: message_attributes.len(),
                max: MAX_MESSAGE_ATTRIBUTES,
            });
        }

        let message_body = match (bucket, s3_key) {
            (Some(bucket), Some(key)) => {
                self.blobs
                    .put_object(bucket, &key, body.as_bytes().to_vec())
                    .await?;
                tracing::debug!(bucket, key = %key, encoded_size, "Message body offloaded");
                OffloadPointer::new(bucket, key).to_body()?
            }
            _ => body.to_string(),
        };

        let request = SendMessageRequest {
            queue_url: queue_url.to_string(),
            body: message_body,
            attributes: message_attributes,
            group_id: group_id.to_string(),
            deduplication_id: Uuid::new_v4().to_string(),
        };

        let message_id = self.queue.send_message(request).await?;
        tracing::info!(message_id = %message_id, group_id, "Submitted message to queue");
        Ok(message_id)
    }

    /// Blob key for an offloaded body: the caller's `S3Key` prefix plus a
    /// random suffix, or a random key alone.
    fn s3_key(attributes: &HashMap<String, MessageAttribute>) -> Result<String, QueueError> {
        let suffix = Uuid::new_v4().to_string();
        match attributes.get(S3_KEY_ATTRIBUTE_NAME) {
            None => Ok(suffix),
            Some(attr) => attr
                .as_str()
                .map(|prefix| format!("{prefix}/{suffix}"))
                .ok_or_else(|| {
                    QueueError::InvalidAttribute(format!(
                        "{S3_KEY_ATTRIBUTE_NAME} must be a string attribute"
                    ))
                }),
        }
    }
}
