//! Upstream stores the scanner reads from and writes flags back to.
//!
//! - [`FundStore`]: funds, rounds, events and their state flags
//! - [`ApplicationStore`]: application search and detail
//! - [`AccountStore`]: applicant accounts
//!
//! [`http`] talks to the real services; [`memory`] backs tests.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use roundwatch_common::error::AppError;
use roundwatch_common::types::{Account, Application, ApplicationDetail, Event, Fund, Round};

#[async_trait]
pub trait FundStore: Send + Sync {
    async fn list_funds(&self) -> Result<Vec<Fund>, AppError>;

    async fn get_fund(&self, fund_id: &str) -> Result<Fund, AppError>;

    async fn list_rounds(&self, fund_id: &str) -> Result<Vec<Round>, AppError>;

    async fn list_events(&self, fund_id: &str, round_id: &str) -> Result<Vec<Event>, AppError>;

    /// Set the round's `application_reminder_sent` flag.
    async fn mark_reminder_sent(&self, fund_id: &str, round_id: &str) -> Result<(), AppError>;

    /// Set the event's `processed` flag.
    async fn mark_event_processed(
        &self,
        fund_id: &str,
        round_id: &str,
        event_id: &str,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Applications in the round whose status is not `SUBMITTED`.
    async fn list_unsubmitted(
        &self,
        fund_id: &str,
        round_id: &str,
    ) -> Result<Vec<Application>, AppError>;

    async fn get_application(&self, application_id: &str) -> Result<ApplicationDetail, AppError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account_by_id(&self, account_id: &str) -> Result<Account, AppError>;

    async fn get_account_by_email(&self, email: &str) -> Result<Account, AppError>;
}
