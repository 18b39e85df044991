//! AWS implementations: SQS as the queue, S3 as the blob store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_sqs::primitives::Blob;
use aws_sdk_sqs::types::MessageAttributeValue;

use crate::attributes::MessageAttribute;
use crate::error::QueueError;
use crate::transport::{BlobStore, QueueTransport, SendMessageRequest};

/// SQS-backed queue transport.
#[derive(Debug, Clone)]
pub struct SqsTransport {
    client: aws_sdk_sqs::Client,
}

impl SqsTransport {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }

    fn to_sqs_attribute(attribute: MessageAttribute) -> Result<MessageAttributeValue, QueueError> {
        let builder = MessageAttributeValue::builder().data_type(attribute.data_type());
        let builder = match attribute {
            MessageAttribute::String(value) | MessageAttribute::Number(value) => {
                builder.string_value(value)
            }
            MessageAttribute::Binary(bytes) => builder.binary_value(Blob::new(bytes)),
        };
        builder
            .build()
            .map_err(|e| QueueError::InvalidAttribute(e.to_string()))
    }
}

#[async_trait]
impl QueueTransport for SqsTransport {
    async fn send_message(&self, request: SendMessageRequest) -> Result<String, QueueError> {
        let mut send = self
            .client
            .send_message()
            .queue_url(&request.queue_url)
            .message_body(request.body)
            .message_group_id(request.group_id)
            .message_deduplication_id(request.deduplication_id);

        for (name, attribute) in request.attributes {
            send = send.message_attributes(name, Self::to_sqs_attribute(attribute)?);
        }

        let output = send.send().await.map_err(|e| {
            tracing::error!(
                queue_url = %request.queue_url,
                error = %aws_sdk_sqs::error::DisplayErrorContext(&e),
                "SQS send_message failed"
            );
            QueueError::Transport(aws_sdk_sqs::error::DisplayErrorContext(&e).to_string())
        })?;

        output
            .message_id()
            .map(str::to_string)
            .ok_or_else(|| QueueError::Transport("SQS response carried no message id".to_string()))
    }
}

/// S3-backed blob store.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), QueueError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    bucket,
                    key,
                    error = %aws_sdk_s3::error::DisplayErrorContext(&e),
                    "S3 put_object failed"
                );
                QueueError::BlobStore(aws_sdk_s3::error::DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }
}
