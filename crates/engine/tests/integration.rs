//! End-to-end scans against in-memory upstream stores and queue.
//!
//! ```bash
//! cargo test -p roundwatch-engine --test integration
//! ```

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use roundwatch_common::config::NotifyTemplates;
use roundwatch_common::types::{
    Account, Application, ApplicationStatus, Event, Fund, Round, parse_timestamp,
};
use roundwatch_engine::dispatch::NotificationDispatcher;
use roundwatch_engine::upstream::memory::{FailurePoint, InMemoryUpstream};
use roundwatch_engine::{ScanContext, ScanMode, Scanner};
use roundwatch_notifier::memory::{InMemoryBlobStore, InMemoryQueue};
use roundwatch_notifier::{ExtendedQueueClient, OffloadConfig};

// ============================================================
// Shared helpers
// ============================================================

const QUEUE_URL: &str = "https://sqs.eu-west-2.amazonaws.com/000000000000/notifications.fifo";

fn ts(raw: &str) -> NaiveDateTime {
    parse_timestamp(raw).unwrap()
}

fn fund(id: &str) -> Fund {
    Fund {
        id: id.into(),
        name: format!("Fund {id}"),
    }
}

fn round(id: &str, reminder: Option<&str>, deadline: &str, sent: bool) -> Round {
    Round {
        id: id.into(),
        title: format!("Round {id}"),
        deadline: ts(deadline),
        reminder_date: reminder.map(ts),
        reminder_sent: sent,
        contact_email: Some("help@example.org".into()),
    }
}

fn application(id: &str, account_id: &str, status: ApplicationStatus) -> Application {
    Application {
        id: id.into(),
        account_id: account_id.into(),
        status,
        fund_id: Some("f1".into()),
        round_id: Some("r1".into()),
        extra: Map::new(),
    }
}

fn account(id: &str, email: &str) -> Account {
    Account {
        account_id: id.into(),
        email_address: email.into(),
    }
}

fn event(id: &str, activation: &str, processed: bool) -> Event {
    Event {
        id: id.into(),
        fund_id: Some("f1".into()),
        round_id: Some("r1".into()),
        event_type: "SEND_INCOMPLETE_APPLICATIONS".into(),
        activation_date: ts(activation),
        processed,
    }
}

/// The 15 May scenario: reminder window open, two applications owned by
/// accounts that share one email address.
fn open_window_upstream() -> InMemoryUpstream {
    InMemoryUpstream::new()
        .with_fund(
            fund("f1"),
            vec![round(
                "r1",
                Some("2025-05-01T00:00:00"),
                "2025-06-01T00:00:00",
                false,
            )],
        )
        .with_applications(
            "f1",
            "r1",
            vec![
                application("a1", "acc1", ApplicationStatus::InProgress),
                application("a2", "acc2", ApplicationStatus::NotStarted),
            ],
        )
        .with_account(account("acc1", "x@example.org"))
        .with_account(account("acc2", "x@example.org"))
}

struct Harness {
    upstream: Arc<InMemoryUpstream>,
    queue: Arc<InMemoryQueue>,
    scanner: Scanner,
}

fn harness(upstream: InMemoryUpstream, queue: InMemoryQueue) -> Harness {
    let upstream = Arc::new(upstream);
    let queue = Arc::new(queue);
    let client = ExtendedQueueClient::new(
        queue.clone(),
        Arc::new(InMemoryBlobStore::new()),
        OffloadConfig::disabled(),
    );
    let ctx = ScanContext {
        funds: upstream.clone(),
        applications: upstream.clone(),
        accounts: upstream.clone(),
        dispatcher: NotificationDispatcher::new(client, QUEUE_URL),
        templates: NotifyTemplates::default(),
    };
    Harness {
        upstream,
        queue,
        scanner: Scanner::new(ctx),
    }
}

// ============================================================
// Deadline reminders
// ============================================================

#[tokio::test]
async fn test_shared_email_gets_one_reminder_and_round_is_marked() {
    let h = harness(open_window_upstream(), InMemoryQueue::new());

    let report = h
        .scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::All)
        .await
        .unwrap();

    let messages = h.queue.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].group_id, "application_deadline_reminder");
    assert_eq!(messages[0].queue_url, QUEUE_URL);

    let body: Value = serde_json::from_str(&messages[0].body).unwrap();
    assert_eq!(body["type"], "APPLICATION_DEADLINE_REMINDER");
    assert_eq!(body["to"], "x@example.org");
    assert_eq!(body["content"]["application"]["deadline_date"], "2025-06-01T00:00:00");

    assert_eq!(
        h.upstream.reminder_marks(),
        vec![("f1".to_string(), "r1".to_string())]
    );
    assert_eq!(report.reminder_rounds_dispatched, 1);
    assert_eq!(report.messages_sent, 1);
}

#[tokio::test]
async fn test_second_scan_does_not_resend_reminder() {
    let h = harness(open_window_upstream(), InMemoryQueue::new());
    let now = ts("2025-05-15T00:00:00");

    h.scanner.run(now, ScanMode::Reminders).await.unwrap();
    h.scanner.run(now, ScanMode::Reminders).await.unwrap();

    assert_eq!(h.queue.messages().len(), 1);
    assert_eq!(h.upstream.reminder_marks().len(), 1);
    assert_eq!(h.upstream.application_queries(), 1);
}

#[tokio::test]
async fn test_reminder_already_sent_skips_search() {
    let upstream = InMemoryUpstream::new().with_fund(
        fund("f1"),
        vec![round(
            "r1",
            Some("2025-05-01T00:00:00"),
            "2025-06-01T00:00:00",
            true,
        )],
    );
    let h = harness(upstream, InMemoryQueue::new());

    h.scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::All)
        .await
        .unwrap();

    assert!(h.queue.messages().is_empty());
    assert!(h.upstream.reminder_marks().is_empty());
    assert_eq!(h.upstream.application_queries(), 0);
}

#[tokio::test]
async fn test_open_window_without_applicants_is_still_marked() {
    let upstream = InMemoryUpstream::new().with_fund(
        fund("f1"),
        vec![round(
            "r1",
            Some("2025-05-01T00:00:00"),
            "2025-06-01T00:00:00",
            false,
        )],
    );
    let h = harness(upstream, InMemoryQueue::new());

    h.scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::Reminders)
        .await
        .unwrap();

    assert!(h.queue.messages().is_empty());
    assert_eq!(h.upstream.reminder_marks().len(), 1);
}

#[tokio::test]
async fn test_all_sends_failed_leaves_round_unmarked() {
    let h = harness(open_window_upstream(), InMemoryQueue::unavailable());

    let report = h
        .scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::Reminders)
        .await
        .unwrap();

    assert!(h.upstream.reminder_marks().is_empty());
    assert_eq!(report.reminder_rounds_failed, 1);
    assert_eq!(report.messages_failed, 1);
}

#[tokio::test]
async fn test_failed_flag_write_is_reported_not_fatal() {
    let h = harness(
        open_window_upstream().failing(FailurePoint::MarkReminderSent),
        InMemoryQueue::new(),
    );

    let report = h
        .scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::Reminders)
        .await
        .unwrap();

    assert_eq!(h.queue.messages().len(), 1);
    assert!(h.upstream.reminder_marks().is_empty());
    assert_eq!(report.state_update_failures, 1);
}

#[tokio::test]
async fn test_account_lookup_failure_counts_but_others_still_sent() {
    let upstream = open_window_upstream()
        .with_applications(
            "f1",
            "r1",
            vec![
                application("a1", "acc1", ApplicationStatus::InProgress),
                application("a3", "acc3", ApplicationStatus::Completed),
            ],
        )
        .failing(FailurePoint::Account("acc3".into()));
    let h = harness(upstream, InMemoryQueue::new());

    let report = h
        .scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::Reminders)
        .await
        .unwrap();

    assert_eq!(h.queue.messages().len(), 1);
    assert_eq!(report.messages_sent, 1);
    assert_eq!(report.messages_failed, 1);
    assert_eq!(h.upstream.reminder_marks().len(), 1);
}

// ============================================================
// Events
// ============================================================

fn event_upstream(events: Vec<Event>) -> InMemoryUpstream {
    InMemoryUpstream::new()
        .with_fund(
            fund("f1"),
            vec![round("r1", None, "2025-06-01T00:00:00", false)],
        )
        .with_events("f1", "r1", events)
}

#[tokio::test]
async fn test_due_event_with_no_applicants_is_processed() {
    let h = harness(
        event_upstream(vec![event("e1", "2025-06-02T00:00:00", false)]),
        InMemoryQueue::new(),
    );

    let report = h
        .scanner
        .run(ts("2025-06-02T10:00:00"), ScanMode::Events)
        .await
        .unwrap();

    assert!(h.queue.messages().is_empty());
    assert_eq!(
        h.upstream.event_marks(),
        vec![("f1".to_string(), "r1".to_string(), "e1".to_string())]
    );
    assert_eq!(report.events_processed, 1);
}

#[tokio::test]
async fn test_due_event_notifies_incomplete_applications_once() {
    let upstream = event_upstream(vec![event("e1", "2025-06-01T00:00:00", false)])
        .with_applications(
            "f1",
            "r1",
            vec![
                application("a1", "acc1", ApplicationStatus::InProgress),
                application("a2", "acc2", ApplicationStatus::Submitted),
            ],
        )
        .with_account(account("acc1", "one@example.org"))
        .with_account(account("acc2", "two@example.org"));
    let h = harness(upstream, InMemoryQueue::new());
    let now = ts("2025-06-02T10:00:00");

    h.scanner.run(now, ScanMode::Events).await.unwrap();
    h.scanner.run(now, ScanMode::Events).await.unwrap();

    let messages = h.queue.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].group_id, "incomplete_application");
    let body: Value = serde_json::from_str(&messages[0].body).unwrap();
    assert_eq!(body["type"], "INCOMPLETE_APPLICATION_RECORDS");
    assert_eq!(body["to"], "one@example.org");
    assert_eq!(body["content"]["application"]["forms"], Value::Array(vec![]));
    assert_eq!(h.upstream.event_marks().len(), 1);
    assert_eq!(h.upstream.application_queries(), 1);
}

#[tokio::test]
async fn test_pending_and_processed_events_are_left_alone() {
    let h = harness(
        event_upstream(vec![
            event("future", "2025-07-01T00:00:00", false),
            event("done", "2025-05-01T00:00:00", true),
        ]),
        InMemoryQueue::new(),
    );

    let report = h
        .scanner
        .run(ts("2025-06-02T10:00:00"), ScanMode::Events)
        .await
        .unwrap();

    assert!(h.upstream.event_marks().is_empty());
    assert_eq!(h.upstream.application_queries(), 0);
    assert_eq!(report.events_processed, 0);
}

#[tokio::test]
async fn test_unknown_event_type_stays_due() {
    let mut unknown = event("e1", "2025-06-01T00:00:00", false);
    unknown.event_type = "SEND_SURVEY".into();
    let h = harness(event_upstream(vec![unknown]), InMemoryQueue::new());
    let now = ts("2025-06-02T10:00:00");

    let first = h.scanner.run(now, ScanMode::Events).await.unwrap();
    let second = h.scanner.run(now, ScanMode::Events).await.unwrap();

    assert_eq!(first.events_unrecognized, 1);
    assert_eq!(second.events_unrecognized, 1);
    assert!(h.upstream.event_marks().is_empty());
    assert_eq!(h.upstream.application_queries(), 0);
}

#[tokio::test]
async fn test_all_sends_failed_leaves_event_due() {
    let upstream = event_upstream(vec![event("e1", "2025-06-01T00:00:00", false)])
        .with_applications(
            "f1",
            "r1",
            vec![application("a1", "acc1", ApplicationStatus::InProgress)],
        )
        .with_account(account("acc1", "one@example.org"));
    let h = harness(upstream, InMemoryQueue::unavailable());
    let now = ts("2025-06-02T10:00:00");

    let first = h.scanner.run(now, ScanMode::Events).await.unwrap();
    let second = h.scanner.run(now, ScanMode::Events).await.unwrap();

    assert_eq!(first.events_failed, 1);
    assert_eq!(first.messages_failed, 1);
    assert_eq!(first.events_processed, 0);
    assert_eq!(second.events_failed, 1);
    assert!(h.upstream.event_marks().is_empty());
    assert_eq!(h.upstream.application_queries(), 2);
}

#[tokio::test]
async fn test_failed_handler_leaves_event_due_for_retry() {
    let upstream = event_upstream(vec![event("e1", "2025-06-01T00:00:00", false)])
        .failing(FailurePoint::Applications("r1".into()));
    let h = harness(upstream, InMemoryQueue::new());

    let report = h
        .scanner
        .run(ts("2025-06-02T10:00:00"), ScanMode::Events)
        .await
        .unwrap();

    assert!(h.upstream.event_marks().is_empty());
    assert_eq!(report.events_failed, 1);
}

// ============================================================
// Scan-level failures
// ============================================================

#[tokio::test]
async fn test_fund_listing_failure_aborts_scan() {
    let h = harness(
        open_window_upstream().failing(FailurePoint::ListFunds),
        InMemoryQueue::new(),
    );

    let result = h
        .scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::All)
        .await;

    assert!(result.is_err());
    assert!(h.queue.messages().is_empty());
}

#[tokio::test]
async fn test_rounds_failure_skips_only_that_fund() {
    let upstream = open_window_upstream()
        .with_fund(
            fund("f2"),
            vec![round(
                "r2",
                Some("2025-05-01T00:00:00"),
                "2025-06-01T00:00:00",
                false,
            )],
        )
        .failing(FailurePoint::Rounds("f2".into()));
    let h = harness(upstream, InMemoryQueue::new());

    let report = h
        .scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::All)
        .await
        .unwrap();

    assert_eq!(report.funds_scanned, 1);
    assert_eq!(report.funds_skipped, 1);
    assert_eq!(h.queue.messages().len(), 1);
}

#[tokio::test]
async fn test_events_failure_skips_round_but_reminders_still_run() {
    let h = harness(
        open_window_upstream().failing(FailurePoint::Events("r1".into())),
        InMemoryQueue::new(),
    );

    let report = h
        .scanner
        .run(ts("2025-05-15T00:00:00"), ScanMode::All)
        .await
        .unwrap();

    assert_eq!(report.event_fetches_failed, 1);
    assert_eq!(report.reminder_rounds_dispatched, 1);
    assert_eq!(h.upstream.reminder_marks().len(), 1);
}
