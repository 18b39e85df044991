use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Inline-size ceiling for queue message bodies (SQS maximum payload).
pub const DEFAULT_MESSAGE_SIZE_THRESHOLD: usize = 262_144;

/// Path templates for the upstream stores. Placeholders use `{name}` syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub funds: String,
    pub fund: String,
    pub fund_rounds: String,
    pub fund_events: String,
    pub fund_event: String,
    pub application_reminder_status: String,
    pub applications: String,
    pub application: String,
    pub accounts: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            funds: "/funds".to_string(),
            fund: "/fund/{fund_id}".to_string(),
            fund_rounds: "/fund/{fund_id}/rounds".to_string(),
            fund_events: "/fund/{fund_id}/round/{round_id}/events".to_string(),
            fund_event: "/fund/{fund_id}/round/{round_id}/event/{event_id}".to_string(),
            application_reminder_status: "/fund/{fund_id}/round/{round_id}".to_string(),
            applications: "/applications".to_string(),
            application: "/application/{application_id}".to_string(),
            accounts: "/accounts".to_string(),
        }
    }
}

/// Notification template identifiers, sent as the payload `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTemplates {
    pub application_deadline_reminder: String,
    pub incomplete_application: String,
}

impl Default for NotifyTemplates {
    fn default() -> Self {
        Self {
            application_deadline_reminder: "APPLICATION_DEADLINE_REMINDER".to_string(),
            incomplete_application: "INCOMPLETE_APPLICATION_RECORDS".to_string(),
        }
    }
}

/// Global application configuration loaded from environment variables.
///
/// Built once at process start and handed to every component by reference.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Fund Store base URL (funds, rounds, events)
    pub fund_store_api_host: String,

    /// Application Store base URL
    pub application_store_api_host: String,

    /// Account Store base URL
    pub account_store_api_host: String,

    pub endpoints: Endpoints,

    pub templates: NotifyTemplates,

    /// AWS region for SQS and S3 (default: eu-west-2)
    pub aws_region: String,

    /// Endpoint override for local stacks (e.g. localstack)
    pub aws_endpoint_override: Option<String>,

    /// Bucket for offloaded message bodies. Offload is disabled when unset.
    pub aws_msg_bucket_name: Option<String>,

    /// FIFO queue receiving notification messages
    pub queue_url: String,

    /// Bodies larger than this many bytes are offloaded (default: 262144)
    pub message_size_threshold: usize,

    /// Offload every body regardless of size
    pub always_through_s3: bool,

    /// Zone used to derive the naive "now" that round timestamps are compared with
    pub scan_timezone: Tz,

    /// Per-request timeout for upstream HTTP calls (default: 30)
    pub http_timeout_secs: u64,

    /// Redis connection string. Enables the scan lock when set.
    pub redis_url: Option<String>,

    /// Scan lock lease length in seconds (default: 900)
    pub scan_lock_ttl_seconds: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{key} environment variable is required"))
        };
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            funds: or_default("FUNDS_ENDPOINT", &defaults.funds),
            fund: or_default("FUND_ENDPOINT", &defaults.fund),
            fund_rounds: or_default("FUND_ROUNDS_ENDPOINT", &defaults.fund_rounds),
            fund_events: or_default("FUND_EVENTS_ENDPOINT", &defaults.fund_events),
            fund_event: or_default("FUND_EVENT_ENDPOINT", &defaults.fund_event),
            application_reminder_status: or_default(
                "APPLICATION_REMINDER_STATUS",
                &defaults.application_reminder_status,
            ),
            applications: or_default("APPLICATIONS_ENDPOINT", &defaults.applications),
            application: or_default("APPLICATION_ENDPOINT", &defaults.application),
            accounts: or_default("ACCOUNTS_ENDPOINT", &defaults.accounts),
        };

        let template_defaults = NotifyTemplates::default();
        let templates = NotifyTemplates {
            application_deadline_reminder: or_default(
                "NOTIFY_TEMPLATE_APPLICATION_DEADLINE_REMINDER",
                &template_defaults.application_deadline_reminder,
            ),
            incomplete_application: or_default(
                "NOTIFY_TEMPLATE_INCOMPLETE_APPLICATION",
                &template_defaults.incomplete_application,
            ),
        };

        Ok(Self {
            fund_store_api_host: required("FUND_STORE_API_HOST")?,
            application_store_api_host: required("APPLICATION_STORE_API_HOST")?,
            account_store_api_host: required("ACCOUNT_STORE_API_HOST")?,
            endpoints,
            templates,
            aws_region: or_default("AWS_REGION", "eu-west-2"),
            aws_endpoint_override: lookup("AWS_ENDPOINT_OVERRIDE").filter(|v| !v.is_empty()),
            aws_msg_bucket_name: lookup("AWS_MSG_BUCKET_NAME").filter(|v| !v.is_empty()),
            queue_url: required("AWS_SQS_NOTIF_APP_PRIMARY_QUEUE_URL")?,
            message_size_threshold: or_default(
                "MESSAGE_SIZE_THRESHOLD",
                &DEFAULT_MESSAGE_SIZE_THRESHOLD.to_string(),
            )
            .parse()
            .map_err(|_| anyhow::anyhow!("MESSAGE_SIZE_THRESHOLD must be a valid usize"))?,
            always_through_s3: parse_bool(&or_default("ALWAYS_THROUGH_S3", "false"))
                .ok_or_else(|| anyhow::anyhow!("ALWAYS_THROUGH_S3 must be true or false"))?,
            scan_timezone: or_default("SCAN_TIMEZONE", "Europe/London")
                .parse()
                .map_err(|_| anyhow::anyhow!("SCAN_TIMEZONE must be a valid IANA timezone"))?,
            http_timeout_secs: or_default("HTTP_TIMEOUT_SECS", "30")
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid u64"))?,
            redis_url: lookup("REDIS_URL").filter(|v| !v.is_empty()),
            scan_lock_ttl_seconds: or_default("SCAN_LOCK_TTL_SECONDS", "900")
                .parse()
                .map_err(|_| anyhow::anyhow!("SCAN_LOCK_TTL_SECONDS must be a valid u64"))?,
        })
    }

    /// Current wall-clock time in the scan timezone, without offset.
    ///
    /// Round and event timestamps are published as naive local times, so the
    /// comparison must happen in the same zone.
    pub fn scan_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.scan_timezone).naive_local()
    }
}

/// Substitute `{name}` placeholders in an endpoint template.
pub fn expand(template: &str, params: &[(&str, &str)]) -> String {
    params.iter().fold(template.to_string(), |path, (name, value)| {
        path.replace(&format!("{{{name}}}"), value)
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
