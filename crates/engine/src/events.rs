//! Event state machine.
//!
//! `PENDING` (activation in the future) → `DUE` (activation reached, not
//! processed) → `PROCESSED` (terminal). The `DUE → PROCESSED` transition is
//! written upstream only after the handler succeeds; a failed handler leaves
//! the event due, so the next scan invokes it again.

use chrono::NaiveDateTime;

use roundwatch_common::error::AppError;
use roundwatch_common::types::Event;

use crate::candidate::{NotificationKind, RoundScope};
use crate::context::ScanContext;
use crate::dispatch::DispatchReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    Pending,
    Due,
    Processed,
}

impl EventState {
    pub fn of(event: &Event, now: NaiveDateTime) -> Self {
        if event.processed {
            EventState::Processed
        } else if now < event.activation_date {
            EventState::Pending
        } else {
            EventState::Due
        }
    }
}

/// Every event type the scanner knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SendIncompleteApplications,
}

impl EventKind {
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::SendIncompleteApplications => "SEND_INCOMPLETE_APPLICATIONS",
        }
    }

    /// Resolve a wire tag. `None` means the tag is not recognised.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SEND_INCOMPLETE_APPLICATIONS" => Some(EventKind::SendIncompleteApplications),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Result of running the state machine over one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Pending or already processed; no handler call.
    NotDue(EventState),
    /// Due, but the type tag is unknown. Stays due until support is added.
    Unrecognized(String),
    /// Handler failed; the event stays due for the next scan.
    HandlerFailed { report: DispatchReport },
    /// Handler succeeded. `marked` is false when the flag write failed.
    Processed { report: DispatchReport, marked: bool },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventStateMachine;

impl EventStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// Fetch and process every event of a round.
    pub async fn process_round(
        &self,
        ctx: &ScanContext,
        scope: RoundScope<'_>,
        now: NaiveDateTime,
    ) -> Result<Vec<EventOutcome>, AppError> {
        let events = ctx
            .funds
            .list_events(&scope.fund.id, &scope.round.id)
            .await?;

        let mut outcomes = Vec::with_capacity(events.len());
        for event in &events {
            outcomes.push(self.process_event(ctx, scope, event, now).await);
        }
        Ok(outcomes)
    }

    pub async fn process_event(
        &self,
        ctx: &ScanContext,
        scope: RoundScope<'_>,
        event: &Event,
        now: NaiveDateTime,
    ) -> EventOutcome {
        let state = EventState::of(event, now);
        if state != EventState::Due {
            return EventOutcome::NotDue(state);
        }

        let Some(kind) = EventKind::from_tag(&event.event_type) else {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Incompatible event type found"
            );
            return EventOutcome::Unrecognized(event.event_type.clone());
        };

        let report = match Self::run_handler(kind, ctx, scope).await {
            Ok(report) if report.is_success() => report,
            Ok(report) => {
                tracing::warn!(
                    event_id = %event.id,
                    kind = %kind,
                    failed = report.failed,
                    "Event handler did not succeed, leaving event due"
                );
                return EventOutcome::HandlerFailed { report };
            }
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    kind = %kind,
                    error = %e,
                    "Event handler failed, leaving event due"
                );
                return EventOutcome::HandlerFailed {
                    report: DispatchReport::default(),
                };
            }
        };

        let marked = match ctx
            .funds
            .mark_event_processed(&scope.fund.id, &scope.round.id, &event.id)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    event_id = %event.id,
                    "Event has been marked as processed for {} {}",
                    scope.fund.name,
                    scope.round.title
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    error = %e,
                    "Failed to mark event as processed for {} {}",
                    scope.fund.name,
                    scope.round.title
                );
                false
            }
        };

        EventOutcome::Processed { report, marked }
    }

    async fn run_handler(
        kind: EventKind,
        ctx: &ScanContext,
        scope: RoundScope<'_>,
    ) -> Result<DispatchReport, AppError> {
        match kind {
            EventKind::SendIncompleteApplications => {
                ctx.notify_unsubmitted(scope, NotificationKind::IncompleteApplication)
                    .await
            }
        }
    }
}
