//! HTTP clients for the Fund, Application and Account stores.
//!
//! Reads map every failure (transport, non-2xx, undecodable JSON) to
//! `AppError::UpstreamFetch`; flag writes map to `AppError::StateUpdate`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use roundwatch_common::config::{AppConfig, Endpoints, expand};
use roundwatch_common::error::AppError;
use roundwatch_common::types::{
    Account, Application, ApplicationDetail, ApplicationStatus, Event, Fund, Round,
};

use super::{AccountStore, ApplicationStore, FundStore};

/// Thin JSON-over-HTTP client bound to one base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// GET and decode; `404` yields `None`.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, AppError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("GET {url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::info!(url = %url, "No data retrieved");
            return Ok(None);
        }
        if !status.is_success() {
            tracing::error!(url = %url, status = status.as_u16(), "Unable to retrieve data");
            return Err(AppError::UpstreamFetch(format!("GET {url} returned {status}")));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| AppError::UpstreamFetch(format!("GET {url}: invalid body: {e}")))
    }

    /// GET and decode; `404` is an error.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        self.get_optional(path, query).await?.ok_or_else(|| {
            AppError::UpstreamFetch(format!("GET {} returned 404 Not Found", self.url(path)))
        })
    }

    pub async fn put(&self, path: &str, query: &[(&str, &str)]) -> Result<(), AppError> {
        let url = self.url(path);
        let response = self
            .client
            .put(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::StateUpdate(format!("PUT {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::StateUpdate(format!("PUT {url} returned {status}")));
        }
        Ok(())
    }
}

/// Fund Store client.
#[derive(Debug, Clone)]
pub struct HttpFundStore {
    http: HttpClient,
    endpoints: Endpoints,
}

impl HttpFundStore {
    pub fn new(http: HttpClient, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http = HttpClient::new(
            config.fund_store_api_host.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        Ok(Self::new(http, config.endpoints.clone()))
    }
}

#[async_trait]
impl FundStore for HttpFundStore {
    async fn list_funds(&self) -> Result<Vec<Fund>, AppError> {
        self.http.get_json(&self.endpoints.funds, &[]).await
    }

    async fn get_fund(&self, fund_id: &str) -> Result<Fund, AppError> {
        let path = expand(&self.endpoints.fund, &[("fund_id", fund_id)]);
        self.http.get_json(&path, &[]).await
    }

    async fn list_rounds(&self, fund_id: &str) -> Result<Vec<Round>, AppError> {
        let path = expand(&self.endpoints.fund_rounds, &[("fund_id", fund_id)]);
        self.http.get_json(&path, &[]).await
    }

    async fn list_events(&self, fund_id: &str, round_id: &str) -> Result<Vec<Event>, AppError> {
        let path = expand(
            &self.endpoints.fund_events,
            &[("fund_id", fund_id), ("round_id", round_id)],
        );
        Ok(self.http.get_optional(&path, &[]).await?.unwrap_or_default())
    }

    async fn mark_reminder_sent(&self, fund_id: &str, round_id: &str) -> Result<(), AppError> {
        let path = expand(
            &self.endpoints.application_reminder_status,
            &[("fund_id", fund_id), ("round_id", round_id)],
        );
        self.http
            .put(&path, &[("application_reminder_sent", "true")])
            .await
    }

    async fn mark_event_processed(
        &self,
        fund_id: &str,
        round_id: &str,
        event_id: &str,
    ) -> Result<(), AppError> {
        let path = expand(
            &self.endpoints.fund_event,
            &[("fund_id", fund_id), ("round_id", round_id), ("event_id", event_id)],
        );
        self.http.put(&path, &[("processed", "true")]).await
    }
}

/// Application Store client.
#[derive(Debug, Clone)]
pub struct HttpApplicationStore {
    http: HttpClient,
    endpoints: Endpoints,
}

impl HttpApplicationStore {
    pub fn new(http: HttpClient, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http = HttpClient::new(
            config.application_store_api_host.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        Ok(Self::new(http, config.endpoints.clone()))
    }

    /// Search parameters selecting every non-submitted application in a round.
    pub fn unsubmitted_query<'a>(fund_id: &'a str, round_id: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut query: Vec<(&str, &str)> = ApplicationStatus::UNSUBMITTED
            .iter()
            .map(|status| ("status_only", status.as_str()))
            .collect();
        query.push(("fund_id", fund_id));
        query.push(("round_id", round_id));
        query
    }
}

#[async_trait]
impl ApplicationStore for HttpApplicationStore {
    async fn list_unsubmitted(
        &self,
        fund_id: &str,
        round_id: &str,
    ) -> Result<Vec<Application>, AppError> {
        let query = Self::unsubmitted_query(fund_id, round_id);
        self.http.get_json(&self.endpoints.applications, &query).await
    }

    async fn get_application(&self, application_id: &str) -> Result<ApplicationDetail, AppError> {
        let path = expand(&self.endpoints.application, &[("application_id", application_id)]);
        self.http.get_json(&path, &[]).await
    }
}

/// Account Store client.
#[derive(Debug, Clone)]
pub struct HttpAccountStore {
    http: HttpClient,
    endpoints: Endpoints,
}

impl HttpAccountStore {
    pub fn new(http: HttpClient, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http = HttpClient::new(
            config.account_store_api_host.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        Ok(Self::new(http, config.endpoints.clone()))
    }
}

#[async_trait]
impl AccountStore for HttpAccountStore {
    async fn get_account_by_id(&self, account_id: &str) -> Result<Account, AppError> {
        self.http
            .get_json(&self.endpoints.accounts, &[("account_id", account_id)])
            .await
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Account, AppError> {
        self.http
            .get_json(&self.endpoints.accounts, &[("email_address", email)])
            .await
    }
}
