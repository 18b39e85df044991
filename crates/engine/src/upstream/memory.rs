//! In-memory upstream stores for tests.
//!
//! One [`InMemoryUpstream`] implements all three store traits. Flag writes
//! mutate the stored rounds and events, so a second scan observes them, and
//! every write is recorded for assertions. Individual calls can be made to
//! fail through [`FailurePoint`].

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use roundwatch_common::error::AppError;
use roundwatch_common::types::{
    Account, Application, ApplicationDetail, ApplicationStatus, Event, Fund, Round,
};

use super::{AccountStore, ApplicationStore, FundStore};

/// A call that the in-memory upstream should fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    ListFunds,
    /// `get_fund` for this fund id
    Fund(String),
    /// `list_rounds` for this fund id
    Rounds(String),
    /// `list_events` for this round id
    Events(String),
    /// `list_unsubmitted` for this round id
    Applications(String),
    /// `get_application` for this application id
    ApplicationDetail(String),
    /// `get_account_by_id` for this account id
    Account(String),
    MarkReminderSent,
    MarkEventProcessed,
}

#[derive(Debug, Default)]
struct UpstreamState {
    funds: Vec<Fund>,
    rounds: HashMap<String, Vec<Round>>,
    events: HashMap<(String, String), Vec<Event>>,
    applications: HashMap<(String, String), Vec<Application>>,
    details: HashMap<String, ApplicationDetail>,
    accounts: HashMap<String, Account>,
    failures: HashSet<FailurePoint>,
    reminder_marks: Vec<(String, String)>,
    event_marks: Vec<(String, String, String)>,
    application_queries: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryUpstream {
    state: Mutex<UpstreamState>,
}

fn poison_err<T>(_: PoisonError<T>) -> AppError {
    AppError::Internal("in-memory upstream lock poisoned".to_string())
}

fn key(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

impl InMemoryUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut UpstreamState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_fund(mut self, fund: Fund, rounds: Vec<Round>) -> Self {
        let state = self.state_mut();
        state.rounds.insert(fund.id.clone(), rounds);
        state.funds.push(fund);
        self
    }

    pub fn with_events(mut self, fund_id: &str, round_id: &str, events: Vec<Event>) -> Self {
        self.state_mut().events.insert(key(fund_id, round_id), events);
        self
    }

    pub fn with_applications(
        mut self,
        fund_id: &str,
        round_id: &str,
        applications: Vec<Application>,
    ) -> Self {
        self.state_mut()
            .applications
            .insert(key(fund_id, round_id), applications);
        self
    }

    pub fn with_detail(mut self, detail: ApplicationDetail) -> Self {
        self.state_mut().details.insert(detail.id.clone(), detail);
        self
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.state_mut()
            .accounts
            .insert(account.account_id.clone(), account);
        self
    }

    pub fn failing(mut self, point: FailurePoint) -> Self {
        self.state_mut().failures.insert(point);
        self
    }

    /// `(fund_id, round_id)` of every successful reminder flag write.
    pub fn reminder_marks(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .map(|s| s.reminder_marks.clone())
            .unwrap_or_default()
    }

    /// `(fund_id, round_id, event_id)` of every successful processed flag write.
    pub fn event_marks(&self) -> Vec<(String, String, String)> {
        self.state
            .lock()
            .map(|s| s.event_marks.clone())
            .unwrap_or_default()
    }

    /// Number of unsubmitted-application searches served.
    pub fn application_queries(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.application_queries)
            .unwrap_or_default()
    }

    fn check(state: &UpstreamState, point: FailurePoint) -> Result<(), AppError> {
        if state.failures.contains(&point) {
            let err = format!("injected failure at {point:?}");
            return Err(match point {
                FailurePoint::MarkReminderSent | FailurePoint::MarkEventProcessed => {
                    AppError::StateUpdate(err)
                }
                _ => AppError::UpstreamFetch(err),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FundStore for InMemoryUpstream {
    async fn list_funds(&self) -> Result<Vec<Fund>, AppError> {
        let state = self.state.lock().map_err(poison_err)?;
        Self::check(&state, FailurePoint::ListFunds)?;
        Ok(state.funds.clone())
    }

    async fn get_fund(&self, fund_id: &str) -> Result<Fund, AppError> {
        let state = self.state.lock().map_err(poison_err)?;
        Self::check(&state, FailurePoint::Fund(fund_id.to_string()))?;
        state
            .funds
            .iter()
            .find(|f| f.id == fund_id)
            .cloned()
            .ok_or_else(|| AppError::UpstreamFetch(format!("fund {fund_id} not found")))
    }

    async fn list_rounds(&self, fund_id: &str) -> Result<Vec<Round>, AppError> {
        let state = self.state.lock().map_err(poison_err)?;
        Self::check(&state, FailurePoint::Rounds(fund_id.to_string()))?;
        Ok(state.rounds.get(fund_id).cloned().unwrap_or_default())
    }

    async fn list_events(&self, fund_id: &str, round_id: &str) -> Result<Vec<Event>, AppError> {
        let state = self.state.lock().map_err(poison_err)?;
        Self::check(&state, FailurePoint::Events(round_id.to_string()))?;
        Ok(state
            .events
            .get(&key(fund_id, round_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_reminder_sent(&self, fund_id: &str, round_id: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().map_err(poison_err)?;
        Self::check(&state, FailurePoint::MarkReminderSent)?;
        if let Some(round) = state
            .rounds
            .get_mut(fund_id)
            .and_then(|rounds| rounds.iter_mut().find(|r| r.id == round_id))
        {
            round.reminder_sent = true;
        }
        state.reminder_marks.push(key(fund_id, round_id));
        Ok(())
    }

    async fn mark_event_processed(
        &self,
        fund_id: &str,
        round_id: &str,
        event_id: &str,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().map_err(poison_err)?;
        Self::check(&state, FailurePoint::MarkEventProcessed)?;
        if let Some(event) = state
            .events
            .get_mut(&key(fund_id, round_id))
            .and_then(|events| events.iter_mut().find(|e| e.id == event_id))
        {
            event.processed = true;
        }
        state
            .event_marks
            .push((fund_id.to_string(), round_id.to_string(), event_id.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ApplicationStore for InMemoryUpstream {
    async fn list_unsubmitted(
        &self,
        fund_id: &str,
        round_id: &str,
    ) -> Result<Vec<Application>, AppError> {
        let mut state = self.state.lock().map_err(poison_err)?;
        Self::check(&state, FailurePoint::Applications(round_id.to_string()))?;
        state.application_queries += 1;
        Ok(state
            .applications
            .get(&key(fund_id, round_id))
            .map(|apps| {
                apps.iter()
                    .filter(|a| a.status != ApplicationStatus::Submitted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_application(&self, application_id: &str) -> Result<ApplicationDetail, AppError> {
        let state = self.state.lock().map_err(poison_err)?;
        Self::check(
            &state,
            FailurePoint::ApplicationDetail(application_id.to_string()),
        )?;
        Ok(state
            .details
            .get(application_id)
            .cloned()
            .unwrap_or_else(|| ApplicationDetail {
                id: application_id.to_string(),
                forms: serde_json::Value::Array(Vec::new()),
            }))
    }
}

#[async_trait]
impl AccountStore for InMemoryUpstream {
    async fn get_account_by_id(&self, account_id: &str) -> Result<Account, AppError> {
        let state = self.state.lock().map_err(poison_err)?;
        Self::check(&state, FailurePoint::Account(account_id.to_string()))?;
        state
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| AppError::UpstreamFetch(format!("account {account_id} not found")))
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Account, AppError> {
        let state = self.state.lock().map_err(poison_err)?;
        state
            .accounts
            .values()
            .find(|a| a.email_address == email)
            .cloned()
            .ok_or_else(|| AppError::UpstreamFetch(format!("account for {email} not found")))
    }
}
