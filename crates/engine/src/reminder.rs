//! Deadline reminder detector.
//!
//! Each round may configure a reminder date ahead of its deadline. Between
//! the two, every applicant with an unsubmitted application gets one reminder;
//! the round's `reminder_sent` flag then closes the window for good.

use chrono::NaiveDateTime;

use roundwatch_common::types::Round;

use crate::candidate::{NotificationKind, RoundScope};
use crate::context::ScanContext;
use crate::dispatch::DispatchReport;

/// Where `now` falls relative to a round's reminder window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderWindow {
    /// The round has no reminder date.
    NotConfigured,
    /// The reminder already fired; the window is fire-once.
    AlreadySent,
    /// `reminder_date < now < deadline` and not yet sent.
    Open,
    /// `now < reminder_date < deadline`.
    Pending { days_remaining: i64 },
    /// Deadline passed, or the reminder date is not before the deadline.
    Closed,
}

/// Classify a round against `now`.
pub fn classify(round: &Round, now: NaiveDateTime) -> ReminderWindow {
    let Some(reminder_date) = round.reminder_date else {
        return ReminderWindow::NotConfigured;
    };
    if round.reminder_sent {
        return ReminderWindow::AlreadySent;
    }

    let deadline = round.deadline;
    if reminder_date < now && now < deadline {
        ReminderWindow::Open
    } else if now < reminder_date && reminder_date < deadline {
        ReminderWindow::Pending {
            days_remaining: (reminder_date - now).num_days(),
        }
    } else {
        ReminderWindow::Closed
    }
}

/// Result of running the detector over one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    /// Nothing to do for this window.
    Skipped(ReminderWindow),
    /// The unsubmitted-application search failed; retried next scan.
    FetchFailed,
    /// Batch succeeded. `marked` is false when the flag write failed, which
    /// leaves the round open to a duplicate reminder on the next scan.
    Dispatched { report: DispatchReport, marked: bool },
    /// Every send failed; the flag is left unset so the next scan retries.
    DispatchFailed { report: DispatchReport },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineReminderDetector;

impl DeadlineReminderDetector {
    pub fn new() -> Self {
        Self
    }

    pub async fn process_round(
        &self,
        ctx: &ScanContext,
        scope: RoundScope<'_>,
        now: NaiveDateTime,
    ) -> ReminderOutcome {
        let fund_name = &scope.fund.name;
        let round_name = &scope.round.title;

        match classify(scope.round, now) {
            ReminderWindow::Open => {}
            ReminderWindow::NotConfigured => {
                tracing::info!("No reminder is set for the round {} {}", fund_name, round_name);
                return ReminderOutcome::Skipped(ReminderWindow::NotConfigured);
            }
            ReminderWindow::Pending { days_remaining } => {
                tracing::info!(
                    days_remaining,
                    "Application deadline reminder is due in {} days for {} {}",
                    days_remaining,
                    fund_name,
                    round_name
                );
                return ReminderOutcome::Skipped(ReminderWindow::Pending { days_remaining });
            }
            window => {
                tracing::debug!(?window, round_id = %scope.round.id, "Reminder window not open");
                return ReminderOutcome::Skipped(window);
            }
        }

        let report = match ctx
            .notify_unsubmitted(scope, NotificationKind::DeadlineReminder)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(
                    round_id = %scope.round.id,
                    error = %e,
                    "Unable to retrieve unsubmitted applications for {} {}",
                    fund_name,
                    round_name
                );
                return ReminderOutcome::FetchFailed;
            }
        };

        if report.total() == 0 {
            tracing::info!(
                "Currently, there are no non-submitted applications for {} {}",
                fund_name,
                round_name
            );
        }

        if !report.is_success() {
            tracing::error!(
                failed = report.failed,
                "There was a problem sending reminders for {} {}",
                fund_name,
                round_name
            );
            return ReminderOutcome::DispatchFailed { report };
        }

        let marked = match ctx
            .funds
            .mark_reminder_sent(&scope.fund.id, &scope.round.id)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "The application_reminder_sent has been set to True for {} {}",
                    fund_name,
                    round_name
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "There was an issue updating application_reminder_sent for {} {}",
                    fund_name,
                    round_name
                );
                false
            }
        };

        ReminderOutcome::Dispatched { report, marked }
    }
}
