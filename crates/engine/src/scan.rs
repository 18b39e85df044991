//! Scan orchestrator.
//!
//! One scan walks every fund and round sequentially:
//! 1. List funds (failure aborts the scan; there is nothing to iterate)
//! 2. Per fund, fetch fund detail and rounds (failure skips the fund)
//! 3. Per round, run the deadline reminder detector and/or the event state machine
//!
//! Each round and event transition is committed upstream on its own, so a
//! scan that stops halfway is simply resumed by the next one.

use chrono::NaiveDateTime;

use roundwatch_common::error::AppError;
use roundwatch_common::types::Fund;

use crate::candidate::RoundScope;
use crate::context::ScanContext;
use crate::events::{EventOutcome, EventStateMachine};
use crate::reminder::{DeadlineReminderDetector, ReminderOutcome};

/// Which halves of the scan to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    All,
    Reminders,
    Events,
}

impl ScanMode {
    pub fn includes_reminders(&self) -> bool {
        matches!(self, ScanMode::All | ScanMode::Reminders)
    }

    pub fn includes_events(&self) -> bool {
        matches!(self, ScanMode::All | ScanMode::Events)
    }
}

/// Aggregate counts for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub funds_scanned: usize,
    pub funds_skipped: usize,
    pub rounds_scanned: usize,
    pub reminder_rounds_dispatched: usize,
    pub reminder_rounds_failed: usize,
    pub events_processed: usize,
    pub events_failed: usize,
    pub events_unrecognized: usize,
    pub event_fetches_failed: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
    pub state_update_failures: usize,
}

impl ScanReport {
    fn record_reminder(&mut self, outcome: &ReminderOutcome) {
        match outcome {
            ReminderOutcome::Skipped(_) => {}
            ReminderOutcome::FetchFailed => self.reminder_rounds_failed += 1,
            ReminderOutcome::Dispatched { report, marked } => {
                self.reminder_rounds_dispatched += 1;
                self.messages_sent += report.sent;
                self.messages_failed += report.failed;
                if !marked {
                    self.state_update_failures += 1;
                }
            }
            ReminderOutcome::DispatchFailed { report } => {
                self.reminder_rounds_failed += 1;
                self.messages_sent += report.sent;
                self.messages_failed += report.failed;
            }
        }
    }

    fn record_event(&mut self, outcome: &EventOutcome) {
        match outcome {
            EventOutcome::NotDue(_) => {}
            EventOutcome::Unrecognized(_) => self.events_unrecognized += 1,
            EventOutcome::HandlerFailed { report } => {
                self.events_failed += 1;
                self.messages_sent += report.sent;
                self.messages_failed += report.failed;
            }
            EventOutcome::Processed { report, marked } => {
                self.events_processed += 1;
                self.messages_sent += report.sent;
                self.messages_failed += report.failed;
                if !marked {
                    self.state_update_failures += 1;
                }
            }
        }
    }
}

/// Runs complete scans over the Fund Store.
pub struct Scanner {
    ctx: ScanContext,
    reminders: DeadlineReminderDetector,
    events: EventStateMachine,
}

impl Scanner {
    pub fn new(ctx: ScanContext) -> Self {
        Self {
            ctx,
            reminders: DeadlineReminderDetector::new(),
            events: EventStateMachine::new(),
        }
    }

    /// Run one full scan as of `now` (naive time in the scan timezone).
    pub async fn run(&self, now: NaiveDateTime, mode: ScanMode) -> Result<ScanReport, AppError> {
        tracing::info!(now = %now, ?mode, "Scan started");

        let funds = self.ctx.funds.list_funds().await.map_err(|e| {
            tracing::error!(error = %e, "Unable to list funds, aborting scan");
            e
        })?;

        let mut report = ScanReport::default();
        for listed in &funds {
            match self.scan_fund(listed, now, mode, &mut report).await {
                Ok(()) => report.funds_scanned += 1,
                Err(e) => {
                    tracing::warn!(fund_id = %listed.id, error = %e, "Skipping fund for this scan");
                    report.funds_skipped += 1;
                }
            }
        }

        tracing::info!(
            funds_scanned = report.funds_scanned,
            funds_skipped = report.funds_skipped,
            rounds_scanned = report.rounds_scanned,
            events_processed = report.events_processed,
            messages_sent = report.messages_sent,
            messages_failed = report.messages_failed,
            state_update_failures = report.state_update_failures,
            "Scan finished"
        );
        Ok(report)
    }

    async fn scan_fund(
        &self,
        listed: &Fund,
        now: NaiveDateTime,
        mode: ScanMode,
        report: &mut ScanReport,
    ) -> Result<(), AppError> {
        let fund = self.ctx.funds.get_fund(&listed.id).await?;
        let rounds = self.ctx.funds.list_rounds(&listed.id).await?;

        for round in &rounds {
            report.rounds_scanned += 1;
            let scope = RoundScope { fund: &fund, round };

            if mode.includes_reminders() {
                let outcome = self.reminders.process_round(&self.ctx, scope, now).await;
                report.record_reminder(&outcome);
            }

            if mode.includes_events() {
                match self.events.process_round(&self.ctx, scope, now).await {
                    Ok(outcomes) => outcomes.iter().for_each(|o| report.record_event(o)),
                    Err(e) => {
                        tracing::warn!(
                            round_id = %round.id,
                            error = %e,
                            "Unable to retrieve events, skipping round"
                        );
                        report.event_fetches_failed += 1;
                    }
                }
            }
        }

        Ok(())
    }
}
