//! Admin API client
//!
//! A single value carrying the backend base URL and the bearer credential. It is
//! built once from configuration and handed to every job source, executor and
//! poller that needs the backend.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::error::ApiError;
use super::types::{
    ContestList, ContestRecord, DropsBatchRequest, DropsBatchResponse, HierarchyCounts,
    HierarchyRequest, QueueJob, QueueJobList, QueueState, StatsEnvelope, SystemStats,
};
use crate::fleet::FleetStatus;

/// Bearer token; never printed in full
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` for a blank token
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(***)")
    }
}

#[derive(Debug, Clone)]
pub struct AdminApiClient {
    http: reqwest::Client,
    base_url: String,
    credential: Option<Credential>,
}

impl AdminApiClient {
    pub fn new(
        base_url: &str,
        credential: Option<Credential>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("memodrops-admin/{}", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Attach the bearer token, or refuse before anything goes on the wire
    fn authorized(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        match &self.credential {
            Some(credential) => Ok(request.bearer_auth(credential.token())),
            None => Err(ApiError::MissingCredential),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let request = self.authorized(request)?;
        let response = request.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_reqwest)?;

        if !status.is_success() {
            let error = ApiError::from_error_body(status.as_u16(), &body);
            tracing::debug!(status = status.as_u16(), %error, "backend returned an error");
            return Err(error);
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let body = self.send(self.http.get(self.url(endpoint))).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn post_json<B, T>(&self, endpoint: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .send(self.http.post(self.url(endpoint)).json(payload))
            .await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Contests that have an edital URL but no extracted hierarchy yet
    pub async fn list_unprocessed_contests(&self) -> Result<Vec<ContestRecord>, ApiError> {
        let list: ContestList = self.get_json("/admin/contests?unprocessed=true").await?;
        Ok(list.into_records())
    }

    pub async fn list_contests(&self) -> Result<Vec<ContestRecord>, ApiError> {
        let list: ContestList = self.get_json("/admin/contests").await?;
        Ok(list.into_records())
    }

    /// Extract subject → topic → subtopic hierarchy from the contest's edital
    pub async fn process_hierarchy(
        &self,
        contest_id: &str,
        edital_url: &str,
    ) -> Result<HierarchyCounts, ApiError> {
        self.post_json(
            &format!("/admin/contests/{}/process-hierarquia", contest_id),
            &HierarchyRequest { edital_url },
        )
        .await
    }

    pub async fn generate_drops_batch(
        &self,
        contest_id: &str,
        request: DropsBatchRequest,
    ) -> Result<DropsBatchResponse, ApiError> {
        self.post_json(
            &format!("/admin/concursos/{}/gerar-drops-lote", contest_id),
            &request,
        )
        .await
    }

    pub async fn scraper_status(&self) -> Result<FleetStatus, ApiError> {
        let status: FleetStatus = self.get_json("/admin/scrapers/status").await?;
        Ok(status.normalized())
    }

    /// Fire-and-forget: the backend starts every banca scraper in the background
    pub async fn scrape_all(&self) -> Result<(), ApiError> {
        self.send(
            self.http
                .post(self.url("/admin/bancas/scrape-all"))
                .json(&serde_json::json!({})),
        )
        .await
        .map(|_| ())
    }

    pub async fn system_stats(&self) -> Result<SystemStats, ApiError> {
        let envelope: StatsEnvelope = self.get_json("/admin/stats").await?;
        Ok(envelope.into_stats())
    }

    /// Jobs of one queue bucket, newest first as the backend orders them
    pub async fn list_queue_jobs(&self, state: QueueState, limit: u32) -> Result<Vec<QueueJob>, ApiError> {
        let list: QueueJobList = self
            .get_json(&format!("/admin/queues/jobs?status={}&limit={}", state, limit))
            .await?;
        Ok(list.data)
    }

    /// Put a failed job back on the queue. The response body is ignored.
    pub async fn retry_queue_job(&self, job_id: &str) -> Result<(), ApiError> {
        self.send(self.http.post(self.url(&format!("/admin/queues/jobs/{}/retry", job_id))))
            .await
            .map(|_| ())
    }
}
