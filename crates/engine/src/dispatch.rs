//! Notification dispatch engine.
//!
//! Sends each candidate independently through the extended queue client. A
//! failure on one recipient never aborts the batch; it only counts against
//! the batch report that callers use to decide whether to flip the round or
//! event flag.

use std::collections::{BTreeMap, HashMap};

use roundwatch_common::error::AppError;
use roundwatch_notifier::attributes::S3_KEY_ATTRIBUTE_NAME;
use roundwatch_notifier::{ExtendedQueueClient, MessageAttribute};

use crate::candidate::NotificationCandidate;

/// Outcome counts of one dispatch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }

    /// At least one message went out, or there was nothing to send.
    pub fn is_success(&self) -> bool {
        self.total() == 0 || self.failed < self.total()
    }

    /// Count failures that happened before dispatch (e.g. account lookup).
    pub fn with_failures(mut self, failures: usize) -> Self {
        self.failed += failures;
        self
    }
}

/// Submits notification candidates to the notification queue.
#[derive(Clone)]
pub struct NotificationDispatcher {
    client: ExtendedQueueClient,
    queue_url: String,
}

impl NotificationDispatcher {
    pub fn new(client: ExtendedQueueClient, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Dispatch every deduplicated candidate, in key order.
    pub async fn dispatch_batch(
        &self,
        candidates: &BTreeMap<String, NotificationCandidate>,
    ) -> DispatchReport {
        let total = candidates.len();
        let mut report = DispatchReport::default();

        for (count, (email, candidate)) in candidates.iter().enumerate() {
            tracing::info!(
                kind = %candidate.kind,
                application_id = %candidate.application_id,
                "Sending notification {} of {} to {}",
                count + 1,
                total,
                email
            );

            match self.dispatch_one(candidate).await {
                Ok(message_id) => {
                    tracing::debug!(message_id = %message_id, "Notification queued");
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::error!(
                        application_id = %candidate.application_id,
                        error = %e,
                        "Unable to queue notification"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Serialize and submit one candidate, returning the queue message id.
    pub async fn dispatch_one(
        &self,
        candidate: &NotificationCandidate,
    ) -> Result<String, AppError> {
        let body = serde_json::to_string(&candidate.payload)
            .map_err(|e| AppError::QueueSubmit(format!("payload serialization: {e}")))?;

        let attributes = HashMap::from([
            (
                "application_id".to_string(),
                MessageAttribute::string(&candidate.application_id),
            ),
            (
                S3_KEY_ATTRIBUTE_NAME.to_string(),
                MessageAttribute::string(candidate.s3_key_prefix()),
            ),
        ]);

        let message_id = self
            .client
            .submit(&self.queue_url, &body, candidate.kind.group_id(), attributes)
            .await?;
        Ok(message_id)
    }
}
