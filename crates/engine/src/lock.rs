//! Redis-backed scan lock.
//!
//! Two scans overlapping on the same upstream state could both observe an
//! open reminder window and both notify. Only the holder of this lock scans.
//!
//! Acquire is `SET key token NX EX ttl`; the TTL frees the lock if the holder
//! dies mid-scan. Release deletes the key only while it still holds our token,
//! so an expired holder never frees a lock taken over by a later scan.

use redis::aio::ConnectionManager;
use uuid::Uuid;

use roundwatch_common::error::AppError;

pub const SCAN_LOCK_KEY: &str = "roundwatch:scan:lock";

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Debug, Clone)]
pub struct ScanLock {
    key: String,
    token: String,
    ttl_secs: u64,
}

impl ScanLock {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_key(SCAN_LOCK_KEY, ttl_secs)
    }

    pub fn with_key(key: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            key: key.into(),
            token: Uuid::new_v4().to_string(),
            ttl_secs: ttl_secs.max(1),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Returns `true` when this process now holds the lock.
    pub async fn try_acquire(&self, redis: &mut ConnectionManager) -> Result<bool, AppError> {
        let result: Option<String> = redis::cmd("SET")
            .arg(&self.key)
            .arg(&self.token)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(redis)
            .await?;

        let acquired = result.is_some();
        if !acquired {
            tracing::warn!(key = %self.key, "Another scan holds the lock");
        }
        Ok(acquired)
    }

    /// Returns `true` when the key was ours and has been deleted.
    pub async fn release(&self, redis: &mut ConnectionManager) -> Result<bool, AppError> {
        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(redis)
            .await?;

        if deleted == 0 {
            tracing::warn!(key = %self.key, "Scan lock expired before release");
        }
        Ok(deleted == 1)
    }
}
