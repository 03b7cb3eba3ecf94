//! Backend API collaborator.
//!
//! The console never talks to storage; every mutation goes through the
//! schedules backend. [`ScheduleApi`] is the seam - controllers hold a
//! trait object so tests can swap in an in-memory backend, and
//! [`HttpScheduleApi`] is the production implementation.
//!
//! All requests carry a hard timeout. The UI fires these calls from
//! interaction handlers and must never hang a dropped drag on a stalled
//! connection.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use schedule_core::policy::format_schedule_time;
use schedule_core::OneTimeSchedule;

/// Per-request timeout for backend calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error talking to the schedules backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (network failure, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("backend rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, best effort.
        message: String,
    },
}

/// Filter for listing schedules.
#[derive(Debug, Clone, Default)]
pub struct ScheduleQuery {
    /// Restrict to one bot instance.
    pub bot_instance_id: Option<String>,
    /// Inclusive start of the date range (reference timezone).
    pub from_date: Option<NaiveDate>,
    /// Inclusive end of the date range (reference timezone).
    pub to_date: Option<NaiveDate>,
}

/// A schedule to be created.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    /// Target bot instance.
    pub bot_instance_id: String,
    /// Phase to run; absent for a full run.
    pub phase_id: Option<String>,
    /// Start instant.
    pub start_at: DateTime<Utc>,
    /// Opaque runner payload.
    pub payload: Option<serde_json::Value>,
}

/// Fields to change on an existing schedule.
#[derive(Debug, Clone, Default)]
pub struct ScheduleChange {
    /// New start instant.
    pub start_at: Option<DateTime<Utc>>,
    /// Replacement runner payload.
    pub payload: Option<serde_json::Value>,
}

/// Result of a bulk day copy.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CopyDayOutcome {
    /// Schedules created on the target day.
    pub copied_count: usize,
    /// Schedules skipped (lead-time rule or duplicates).
    pub skipped_count: usize,
}

/// Operations the schedules backend offers.
#[async_trait]
pub trait ScheduleApi: Send + Sync {
    /// List schedules, optionally filtered by bot and date range.
    async fn list_schedules(&self, query: &ScheduleQuery) -> Result<Vec<OneTimeSchedule>, ApiError>;

    /// Create a schedule. The backend enforces the lead-time rule and
    /// returns its own record (authoritative id and timestamps).
    async fn create_schedule(&self, new: &NewSchedule) -> Result<OneTimeSchedule, ApiError>;

    /// Update a schedule's start and/or payload.
    async fn update_schedule(
        &self,
        id: &str,
        change: &ScheduleChange,
    ) -> Result<OneTimeSchedule, ApiError>;

    /// Delete a schedule. The backend enforces the delete lead-time rule.
    async fn delete_schedule(&self, id: &str) -> Result<(), ApiError>;

    /// Bulk-copy one bot's schedules from one day to another.
    async fn copy_day(
        &self,
        bot_instance_id: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<CopyDayOutcome, ApiError>;
}

#[derive(Debug, Serialize)]
struct CreateScheduleBody<'a> {
    bot_instance_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase_id: Option<&'a str>,
    start_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct UpdateScheduleBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct CopyDayBody<'a> {
    bot_instance_id: &'a str,
    from_date: String,
    to_date: String,
}

/// Reqwest-backed [`ScheduleApi`].
#[derive(Debug, Clone)]
pub struct HttpScheduleApi {
    client: Client,
    base_url: String,
    tz: Tz,
}

impl HttpScheduleApi {
    /// Create a client for the backend at `base_url`.
    ///
    /// Schedule times cross the wire as local wall-clock strings, so the
    /// client needs the reference timezone.
    pub fn new(base_url: impl Into<String>, tz: Tz) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            tz,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn check<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ScheduleApi for HttpScheduleApi {
    async fn list_schedules(&self, query: &ScheduleQuery) -> Result<Vec<OneTimeSchedule>, ApiError> {
        let mut request = self.client.get(self.url("/api/v1/schedules"));
        if let Some(ref bot) = query.bot_instance_id {
            request = request.query(&[("bot_instance_id", bot.as_str())]);
        }
        if let Some(from) = query.from_date {
            request = request.query(&[("from_date", from.to_string())]);
        }
        if let Some(to) = query.to_date {
            request = request.query(&[("to_date", to.to_string())]);
        }
        Self::check(request.send().await?).await
    }

    async fn create_schedule(&self, new: &NewSchedule) -> Result<OneTimeSchedule, ApiError> {
        let body = CreateScheduleBody {
            bot_instance_id: &new.bot_instance_id,
            phase_id: new.phase_id.as_deref(),
            start_at: format_schedule_time(new.start_at, self.tz),
            payload: new.payload.as_ref(),
        };
        let response = self
            .client
            .post(self.url("/api/v1/schedules"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn update_schedule(
        &self,
        id: &str,
        change: &ScheduleChange,
    ) -> Result<OneTimeSchedule, ApiError> {
        let body = UpdateScheduleBody {
            start_at: change
                .start_at
                .map(|start| format_schedule_time(start, self.tz)),
            payload: change.payload.as_ref(),
        };
        let response = self
            .client
            .patch(self.url(&format!("/api/v1/schedules/{id}")))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn delete_schedule(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/v1/schedules/{id}")))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn copy_day(
        &self,
        bot_instance_id: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<CopyDayOutcome, ApiError> {
        let body = CopyDayBody {
            bot_instance_id,
            from_date: from_date.to_string(),
            to_date: to_date.to_string(),
        };
        let response = self
            .client
            .post(self.url("/api/v1/schedules/copy-day"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }
}
