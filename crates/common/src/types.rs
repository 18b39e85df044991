use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire format of every timestamp published by the Fund Store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a Fund Store timestamp, tolerating a fractional-seconds suffix.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
}

/// Serde adapter for naive `YYYY-MM-DDTHH:MM:SS` timestamps.
pub mod naive_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(super::TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Like [`naive_timestamp`], but `null`, missing and empty values become `None`.
pub mod optional_naive_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => s.serialize_str(&ts.format(super::TIMESTAMP_FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) if !raw.trim().is_empty() => super::parse_timestamp(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// A fund as listed by the Fund Store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A time-boxed application period under a fund. Read-only here except for
/// the reminder flag, which is written back through the Fund Store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(with = "naive_timestamp")]
    pub deadline: NaiveDateTime,
    #[serde(default, with = "optional_naive_timestamp")]
    pub reminder_date: Option<NaiveDateTime>,
    #[serde(rename = "application_reminder_sent", default)]
    pub reminder_sent: bool,
    #[serde(default)]
    pub contact_email: Option<String>,
}

/// A scheduled, one-shot action tied to a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub fund_id: Option<String>,
    #[serde(default)]
    pub round_id: Option<String>,
    /// Raw type tag; resolved to a typed kind by the event state machine.
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(with = "naive_timestamp")]
    pub activation_date: NaiveDateTime,
    #[serde(default)]
    pub processed: bool,
}

/// Application Store submission status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    NotStarted,
    InProgress,
    Completed,
    Submitted,
}

impl ApplicationStatus {
    /// Every status that still warrants a reminder. `Submitted` is excluded.
    pub const UNSUBMITTED: [ApplicationStatus; 3] = [
        ApplicationStatus::NotStarted,
        ApplicationStatus::InProgress,
        ApplicationStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::NotStarted => "NOT_STARTED",
            ApplicationStatus::InProgress => "IN_PROGRESS",
            ApplicationStatus::Completed => "COMPLETED",
            ApplicationStatus::Submitted => "SUBMITTED",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an application as returned by the search endpoint.
///
/// Fields the scanner does not interpret are kept in `extra` so they can be
/// forwarded verbatim in notification content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub account_id: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub fund_id: Option<String>,
    #[serde(default)]
    pub round_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Full application record (`GET application/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub id: String,
    #[serde(default)]
    pub forms: serde_json::Value,
}

/// An applicant account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub email_address: String,
}
