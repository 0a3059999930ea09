//! Threat Intelligence Module
//!
//! Clients for the external reputation services:
//! - URL scanning (submission and analysis status)
//! - Domain reputation (risk score, blacklist detections)

pub mod domain_reputation;
pub mod url_scan;

use crate::engine::normalizer::ScanStats;
use crate::{Config, ConfigError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub use domain_reputation::{DomainReputation, ReputationApiClient};
use url_scan::{AnalysisResponse, ErrorResponse, SubmissionResponse};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Submission failed: {0}")]
    Submission(String),
    #[error("Scan did not complete after {attempts} attempts")]
    PollTimeout { attempts: u32 },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Whether another poll attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ScanError::Transport(_) => true,
            ScanError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ScanError::Parse(e.to_string())
        } else {
            ScanError::Transport(e.to_string())
        }
    }
}

/// Opaque identifier of a submitted analysis job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanHandle {
    scan_id: String,
}

impl ScanHandle {
    pub fn new(scan_id: impl Into<String>) -> Self {
        Self {
            scan_id: scan_id.into(),
        }
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }
}

/// Result of a completed analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub scan_id: String,
    /// URL as echoed back by the service
    pub url: Option<String>,
    pub stats: ScanStats,
    pub completed_at: DateTime<Utc>,
}

/// Outcome of a single status fetch
#[derive(Debug)]
pub enum PollOutcome {
    Pending,
    Terminal(ScanReport),
    Error(ScanError),
}

/// Asynchronous URL scanning service
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Submit a URL for analysis
    async fn submit(&self, url: &str) -> Result<ScanHandle, ScanError>;

    /// Fetch the current analysis status once
    async fn poll(&self, handle: &ScanHandle) -> PollOutcome;
}

/// Source of domain reputation data
#[async_trait]
pub trait ReputationSource: Send + Sync {
    async fn domain_reputation(&self, host: &str) -> Result<DomainReputation, ScanError>;
}

/// HTTP client for the URL scanning API
pub struct ScanApiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ScanApiClient {
    /// Create a new client against `base_url`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.scan_api.require_key(Config::SCAN_API_KEY)?;
        Self::new(&config.scan_api.base_url, api_key, config.http_timeout)
    }

    async fn fetch_analysis(&self, handle: &ScanHandle) -> Result<AnalysisResponse, ScanError> {
        let url = format!("{}/analyses/{}", self.base_url, handle.scan_id());

        let response = self
            .http_client
            .get(&url)
            .header("x-apikey", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Upstream {
                status: status.as_u16(),
                message: upstream_message(response).await,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ScanBackend for ScanApiClient {
    async fn submit(&self, url: &str) -> Result<ScanHandle, ScanError> {
        if url.trim().is_empty() {
            return Err(ScanError::InvalidRequest("URL must not be empty".to_string()));
        }

        info!("Submitting URL for scanning: {}", url);

        let response = self
            .http_client
            .post(format!("{}/urls", self.base_url))
            .header("x-apikey", &self.api_key)
            .header("Accept", "application/json")
            .form(&[("url", url)])
            .send()
            .await
            .map_err(|e| ScanError::Submission(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = upstream_message(response).await;
            return Err(ScanError::Submission(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let body: SubmissionResponse = response
            .json()
            .await
            .map_err(|e| ScanError::Submission(e.to_string()))?;

        let handle = body
            .into_handle()
            .ok_or_else(|| ScanError::Submission("response carried no scan id".to_string()))?;

        debug!(scan_id = handle.scan_id(), "Scan submitted");
        Ok(handle)
    }

    async fn poll(&self, handle: &ScanHandle) -> PollOutcome {
        match self.fetch_analysis(handle).await {
            Ok(analysis) => analysis.into_outcome(handle),
            Err(e) => PollOutcome::Error(e),
        }
    }
}

/// Best-effort error text from a failed upstream response
pub(crate) async fn upstream_message(response: reqwest::Response) -> String {
    let fallback = response
        .status()
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string();

    match response.text().await {
        Ok(body) if !body.trim().is_empty() => serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(ErrorResponse::into_message)
            .unwrap_or(body),
        _ => fallback,
    }
}
