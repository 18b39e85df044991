use std::sync::Arc;

use roundwatch_common::config::NotifyTemplates;
use roundwatch_common::error::AppError;
use roundwatch_common::types::{Application, ApplicationStatus};

use crate::candidate::{NotificationCandidate, NotificationKind, RoundScope};
use crate::dedupe::dedupe;
use crate::dispatch::{DispatchReport, NotificationDispatcher};
use crate::upstream::{AccountStore, ApplicationStore, FundStore};

/// Collaborators shared by the reminder detector and the event handlers.
#[derive(Clone)]
pub struct ScanContext {
    pub funds: Arc<dyn FundStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub dispatcher: NotificationDispatcher,
    pub templates: NotifyTemplates,
}

impl ScanContext {
    /// Notify every owner of an unsubmitted application in the round, once
    /// per unique email.
    ///
    /// Fails only when the application search itself fails. A candidate that
    /// cannot be built (account or detail lookup failed) is counted as a
    /// failed send in the returned report.
    pub async fn notify_unsubmitted(
        &self,
        scope: RoundScope<'_>,
        kind: NotificationKind,
    ) -> Result<DispatchReport, AppError> {
        let applications = self
            .applications
            .list_unsubmitted(&scope.fund.id, &scope.round.id)
            .await?;

        let mut candidates = Vec::with_capacity(applications.len());
        let mut build_failures = 0usize;
        for application in applications
            .iter()
            .filter(|a| a.status != ApplicationStatus::Submitted)
        {
            match self.build_candidate(scope, kind, application).await {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    tracing::error!(
                        application_id = %application.id,
                        error = %e,
                        "Unable to retrieve application or account information"
                    );
                    build_failures += 1;
                }
            }
        }

        tracing::info!(
            fund = %scope.fund.name,
            round = %scope.round.title,
            kind = %kind,
            unsubmitted = applications.len(),
            "Found unsubmitted applications"
        );

        let recipients = dedupe(candidates);
        tracing::info!(unique_recipients = recipients.len(), "Total unique email accounts");

        let report = self
            .dispatcher
            .dispatch_batch(&recipients)
            .await
            .with_failures(build_failures);

        tracing::info!(
            fund = %scope.fund.name,
            round = %scope.round.title,
            sent = report.sent,
            failed = report.failed,
            "Sent {} out of {} notifications",
            report.sent,
            report.total()
        );
        Ok(report)
    }

    async fn build_candidate(
        &self,
        scope: RoundScope<'_>,
        kind: NotificationKind,
        application: &Application,
    ) -> Result<NotificationCandidate, AppError> {
        let account = self.accounts.get_account_by_id(&application.account_id).await?;
        match kind {
            NotificationKind::DeadlineReminder => NotificationCandidate::deadline_reminder(
                &self.templates,
                scope,
                application,
                &account,
            ),
            NotificationKind::IncompleteApplication => {
                let detail = self.applications.get_application(&application.id).await?;
                NotificationCandidate::incomplete_application(
                    &self.templates,
                    scope,
                    application,
                    &detail,
                    &account,
                )
            }
        }
    }
}
