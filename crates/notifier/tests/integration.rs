//! Integration tests for the extended queue client against in-memory transports.
//!
//! ```bash
//! cargo test -p roundwatch-notifier --test integration
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use roundwatch_notifier::attributes::{
    MESSAGE_CREATED_AT, RESERVED_ATTRIBUTE_NAME, S3_KEY_ATTRIBUTE_NAME,
};
use roundwatch_notifier::memory::{InMemoryBlobStore, InMemoryQueue};
use roundwatch_notifier::{
    ExtendedQueueClient, MessageAttribute, OffloadConfig, OffloadPointer, QueueError,
};

const QUEUE: &str = "http://localhost:4566/000000000000/notif-app.fifo";

/// Resolve a received body the way a downstream consumer would.
fn resolve(body: &str, blobs: &InMemoryBlobStore) -> String {
    match OffloadPointer::from_body(body) {
        Some(pointer) => {
            let bytes = blobs.get(&pointer.s3_bucket_name, &pointer.s3_key).unwrap();
            String::from_utf8(bytes).unwrap()
        }
        None => body.to_string(),
    }
}

#[tokio::test]
async fn test_consumer_can_reconstruct_offloaded_payload() {
    let queue = Arc::new(InMemoryQueue::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let client = ExtendedQueueClient::new(
        queue.clone(),
        blobs.clone(),
        OffloadConfig::to_bucket("notif-payloads"),
    );

    let payload = serde_json::json!({
        "type": "APPLICATION_DEADLINE_REMINDER",
        "to": "applicant@example.org",
        "content": { "blob": "z".repeat(300_000) }
    })
    .to_string();

    let attrs = HashMap::from([
        (
            S3_KEY_ATTRIBUTE_NAME.to_string(),
            MessageAttribute::string("application_deadline_reminder/app-9"),
        ),
        ("application_id".to_string(), MessageAttribute::string("app-9")),
    ]);
    let message_id = client
        .submit(QUEUE, &payload, "application_deadline_reminder", attrs)
        .await
        .unwrap();

    assert_eq!(queue.message_ids(), vec![message_id]);
    let sent = &queue.messages()[0];
    assert!(sent.body.len() < 1024);
    assert_eq!(resolve(&sent.body, &blobs), payload);
    assert_eq!(
        sent.attributes[RESERVED_ATTRIBUTE_NAME],
        MessageAttribute::number(payload.len())
    );
    assert!(sent.attributes.contains_key(MESSAGE_CREATED_AT));
    assert!(sent.attributes.contains_key(S3_KEY_ATTRIBUTE_NAME));
}

#[tokio::test]
async fn test_queue_failure_surfaces_as_transport_error() {
    let client = ExtendedQueueClient::new(
        Arc::new(InMemoryQueue::unavailable()),
        Arc::new(InMemoryBlobStore::new()),
        OffloadConfig::disabled(),
    );
    let err = client
        .submit(QUEUE, "{}", "incomplete_application", HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::Transport(_)));
}

#[tokio::test]
async fn test_non_string_s3_key_rejected() {
    let client = ExtendedQueueClient::new(
        Arc::new(InMemoryQueue::new()),
        Arc::new(InMemoryBlobStore::new()),
        OffloadConfig::to_bucket("notif-payloads").always_through_s3(),
    );
    let attrs = HashMap::from([(
        S3_KEY_ATTRIBUTE_NAME.to_string(),
        MessageAttribute::Binary(vec![1]),
    )]);
    let err = client.submit(QUEUE, "{}", "g", attrs).await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidAttribute(_)));
}
