//! Notification candidates: one prospective message per application,
//! built by merging the application, its account and round context.

use serde::Serialize;
use serde_json::{Map, Value, json};

use roundwatch_common::config::NotifyTemplates;
use roundwatch_common::error::AppError;
use roundwatch_common::types::{
    Account, Application, ApplicationDetail, Fund, Round, TIMESTAMP_FORMAT,
};

/// Which notification a candidate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    DeadlineReminder,
    IncompleteApplication,
}

impl NotificationKind {
    /// Queue group id. All messages of one kind are strictly ordered.
    pub fn group_id(&self) -> &'static str {
        match self {
            NotificationKind::DeadlineReminder => "application_deadline_reminder",
            NotificationKind::IncompleteApplication => "incomplete_application",
        }
    }

    pub fn template<'a>(&self, templates: &'a NotifyTemplates) -> &'a str {
        match self {
            NotificationKind::DeadlineReminder => &templates.application_deadline_reminder,
            NotificationKind::IncompleteApplication => &templates.incomplete_application,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.group_id())
    }
}

/// The fund and round a notification is scoped to.
#[derive(Debug, Clone, Copy)]
pub struct RoundScope<'a> {
    pub fund: &'a Fund,
    pub round: &'a Round,
}

impl RoundScope<'_> {
    pub fn contact_email(&self) -> Value {
        self.round
            .contact_email
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null)
    }
}

/// Notification Service request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    #[serde(rename = "type")]
    pub template: String,
    pub to: String,
    pub content: Value,
}

/// A message addressed to one recipient about one application.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationCandidate {
    pub kind: NotificationKind,
    pub recipient_email: String,
    pub application_id: String,
    pub payload: NotificationPayload,
}

impl NotificationCandidate {
    /// Reminder that the round deadline is approaching.
    pub fn deadline_reminder(
        templates: &NotifyTemplates,
        scope: RoundScope<'_>,
        application: &Application,
        account: &Account,
    ) -> Result<Self, AppError> {
        let mut fields = application_fields(application)?;
        fields.insert("round_name".into(), json!(scope.round.title));
        fields.insert("fund_name".into(), json!(scope.fund.name));
        fields.insert("contact_help_email".into(), scope.contact_email());
        fields.insert("account_email".into(), json!(account.email_address));
        fields.insert(
            "deadline_date".into(),
            json!(scope.round.deadline.format(TIMESTAMP_FORMAT).to_string()),
        );

        Ok(Self::new(
            NotificationKind::DeadlineReminder,
            templates,
            application,
            account,
            json!({ "application": fields }),
        ))
    }

    /// Notice that an application was left incomplete at the deadline.
    pub fn incomplete_application(
        templates: &NotifyTemplates,
        scope: RoundScope<'_>,
        application: &Application,
        detail: &ApplicationDetail,
        account: &Account,
    ) -> Result<Self, AppError> {
        let mut fields = application_fields(application)?;
        fields.insert("fund_name".into(), json!(scope.fund.name));
        fields.insert("forms".into(), detail.forms.clone());
        fields.insert("round_name".into(), json!(scope.round.title));
        fields.insert("account_email".into(), json!(account.email_address));
        fields.insert("contact_help_email".into(), scope.contact_email());

        Ok(Self::new(
            NotificationKind::IncompleteApplication,
            templates,
            application,
            account,
            json!({
                "application": fields,
                "contact_help_email": scope.contact_email(),
            }),
        ))
    }

    fn new(
        kind: NotificationKind,
        templates: &NotifyTemplates,
        application: &Application,
        account: &Account,
        content: Value,
    ) -> Self {
        Self {
            kind,
            recipient_email: account.email_address.clone(),
            application_id: application.id.clone(),
            payload: NotificationPayload {
                template: kind.template(templates).to_string(),
                to: account.email_address.clone(),
                content,
            },
        }
    }

    /// Blob key prefix used if the payload is offloaded.
    pub fn s3_key_prefix(&self) -> String {
        format!("{}/{}", self.kind.group_id(), self.application_id)
    }
}

fn application_fields(application: &Application) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(application) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(AppError::Internal(format!(
            "application {} serialized to non-object {other}",
            application.id
        ))),
        Err(e) => Err(AppError::Internal(format!(
            "application {} failed to serialize: {e}",
            application.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundwatch_common::types::{ApplicationStatus, parse_timestamp};

    fn fixtures() -> (Fund, Round, Application, Account) {
        let fund = Fund {
            id: "f1".into(),
            name: "Community Ownership Fund".into(),
        };
        let round = Round {
            id: "r1".into(),
            title: "Round 3".into(),
            deadline: parse_timestamp("2025-06-01T00:00:00").unwrap(),
            reminder_date: None,
            reminder_sent: false,
            contact_email: Some("help@example.org".into()),
        };
        let mut extra = Map::new();
        extra.insert("reference".into(), json!("COF-R3-XYZ"));
        let application = Application {
            id: "a1".into(),
            account_id: "acc1".into(),
            status: ApplicationStatus::InProgress,
            fund_id: Some("f1".into()),
            round_id: Some("r1".into()),
            extra,
        };
        let account = Account {
            account_id: "acc1".into(),
            email_address: "applicant@example.org".into(),
        };
        (fund, round, application, account)
    }

    #[test]
    fn test_deadline_reminder_content() {
        let (fund, round, application, account) = fixtures();
        let scope = RoundScope { fund: &fund, round: &round };
        let candidate = NotificationCandidate::deadline_reminder(
            &NotifyTemplates::default(),
            scope,
            &application,
            &account,
        )
        .unwrap();

        assert_eq!(candidate.recipient_email, "applicant@example.org");
        assert_eq!(candidate.payload.template, "APPLICATION_DEADLINE_REMINDER");
        let app = &candidate.payload.content["application"];
        assert_eq!(app["reference"], "COF-R3-XYZ");
        assert_eq!(app["round_name"], "Round 3");
        assert_eq!(app["fund_name"], "Community Ownership Fund");
        assert_eq!(app["contact_help_email"], "help@example.org");
        assert_eq!(app["account_email"], "applicant@example.org");
        assert_eq!(app["deadline_date"], "2025-06-01T00:00:00");
    }

    #[test]
    fn test_incomplete_application_content() {
        let (fund, round, application, account) = fixtures();
        let detail = ApplicationDetail {
            id: "a1".into(),
            forms: json!([{ "name": "project-info", "status": "IN_PROGRESS" }]),
        };
        let candidate = NotificationCandidate::incomplete_application(
            &NotifyTemplates::default(),
            RoundScope { fund: &fund, round: &round },
            &application,
            &detail,
            &account,
        )
        .unwrap();

        assert_eq!(candidate.kind.group_id(), "incomplete_application");
        let content = &candidate.payload.content;
        assert_eq!(content["contact_help_email"], "help@example.org");
        assert_eq!(content["application"]["forms"][0]["name"], "project-info");
        assert_eq!(candidate.s3_key_prefix(), "incomplete_application/a1");
    }

    #[test]
    fn test_payload_wire_shape() {
        let (fund, round, application, account) = fixtures();
        let candidate = NotificationCandidate::deadline_reminder(
            &NotifyTemplates::default(),
            RoundScope { fund: &fund, round: &round },
            &application,
            &account,
        )
        .unwrap();
        let wire = serde_json::to_value(&candidate.payload).unwrap();
        assert_eq!(wire["type"], "APPLICATION_DEADLINE_REMINDER");
        assert_eq!(wire["to"], "applicant@example.org");
        assert!(wire["content"].is_object());
    }
}
