//! Wires configuration into a ready scanner and runs one scan.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use chrono::NaiveDateTime;

use roundwatch_common::config::AppConfig;
use roundwatch_common::redis_pool;
use roundwatch_engine::dispatch::NotificationDispatcher;
use roundwatch_engine::lock::ScanLock;
use roundwatch_engine::upstream::http::{HttpAccountStore, HttpApplicationStore, HttpFundStore};
use roundwatch_engine::{ScanContext, ScanMode, ScanReport, Scanner};
use roundwatch_notifier::aws::{S3BlobStore, SqsTransport};
use roundwatch_notifier::{ExtendedQueueClient, OffloadConfig};

/// Build the extended queue client over SQS and S3.
pub async fn queue_client(config: &AppConfig) -> ExtendedQueueClient {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));
    if let Some(endpoint) = &config.aws_endpoint_override {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.aws_endpoint_override.is_some())
        .build();
    let s3 = aws_sdk_s3::Client::from_conf(s3_config);
    let sqs = aws_sdk_sqs::Client::new(&sdk_config);

    let offload = OffloadConfig::from_config(config);
    if offload.bucket.is_none() {
        tracing::warn!("AWS_MSG_BUCKET_NAME not set, large payloads cannot be offloaded");
    }

    ExtendedQueueClient::new(
        Arc::new(SqsTransport::new(sqs)),
        Arc::new(S3BlobStore::new(s3)),
        offload,
    )
}

pub async fn build_scanner(config: &AppConfig) -> anyhow::Result<Scanner> {
    let funds = Arc::new(HttpFundStore::from_config(config)?);
    let applications = Arc::new(HttpApplicationStore::from_config(config)?);
    let accounts = Arc::new(HttpAccountStore::from_config(config)?);
    let dispatcher = NotificationDispatcher::new(queue_client(config).await, &config.queue_url);

    Ok(Scanner::new(ScanContext {
        funds,
        applications,
        accounts,
        dispatcher,
        templates: config.templates.clone(),
    }))
}

/// Run one scan, under the Redis lock when `REDIS_URL` is set.
///
/// Returns `None` when another scan holds the lock.
pub async fn run(
    config: &AppConfig,
    scanner: &Scanner,
    now: NaiveDateTime,
    mode: ScanMode,
) -> anyhow::Result<Option<ScanReport>> {
    let Some(redis_url) = &config.redis_url else {
        return Ok(Some(scanner.run(now, mode).await?));
    };

    let mut redis = redis_pool::create_redis_pool(redis_url).await?;
    let lock = ScanLock::new(config.scan_lock_ttl_seconds);
    if !lock.try_acquire(&mut redis).await? {
        tracing::info!(key = lock.key(), "Scan already in progress elsewhere, skipping");
        return Ok(None);
    }

    let result = scanner.run(now, mode).await;

    if let Err(e) = lock.release(&mut redis).await {
        tracing::warn!(error = %e, "Failed to release scan lock, it will expire");
    }

    Ok(Some(result?))
}
