//! Domain Reputation Module
//!
//! Client for the domain reputation endpoint (risk score, blacklist hits,
//! domain age, hosting country).

use super::{upstream_message, ReputationSource, ScanError};
use crate::{ApiEndpoint, Config, ConfigError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Domain reputation payload
#[derive(Debug, Deserialize)]
pub struct DomainReputationResponse {
    pub risk_score: Option<RiskScore>,
    pub blacklists: Option<Blacklists>,
    pub domain_info: Option<DomainInfo>,
    pub server_details: Option<ServerDetails>,
}

#[derive(Debug, Deserialize)]
pub struct RiskScore {
    pub result: u32,
}

#[derive(Debug, Deserialize)]
pub struct Blacklists {
    pub detections: u32,
}

#[derive(Debug, Deserialize)]
pub struct DomainInfo {
    pub domain_age_in_years: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ServerDetails {
    pub country_name: Option<String>,
}

/// Reputation of a single host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainReputation {
    pub host: String,
    /// 0-100, higher is riskier
    pub risk_score: u32,
    pub detections: u32,
    pub domain_age_years: Option<f64>,
    pub country: Option<String>,
}

impl DomainReputationResponse {
    pub fn into_reputation(self, host: &str) -> Result<DomainReputation, ScanError> {
        let risk_score = self
            .risk_score
            .ok_or_else(|| ScanError::Parse("missing risk_score".to_string()))?
            .result;
        let detections = self
            .blacklists
            .ok_or_else(|| ScanError::Parse("missing blacklists".to_string()))?
            .detections;

        Ok(DomainReputation {
            host: host.to_string(),
            risk_score,
            detections,
            domain_age_years: self.domain_info.and_then(|d| d.domain_age_in_years),
            country: self
                .server_details
                .and_then(|s| s.country_name)
                .filter(|c| !c.is_empty()),
        })
    }
}

/// HTTP client for the domain reputation API
pub struct ReputationApiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ReputationApiClient {
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
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_endpoint(endpoint: &ApiEndpoint, timeout: Duration) -> Result<Self, ConfigError> {
        let api_key = endpoint.require_key(Config::REPUTATION_API_KEY)?;
        Self::new(&endpoint.base_url, api_key, timeout)
    }
}

#[async_trait]
impl ReputationSource for ReputationApiClient {
    async fn domain_reputation(&self, host: &str) -> Result<DomainReputation, ScanError> {
        if host.trim().is_empty() {
            return Err(ScanError::InvalidRequest("host must not be empty".to_string()));
        }

        info!("Fetching domain reputation for {}", host);

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("host", host)])
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

        let body: DomainReputationResponse = response.json().await?;
        body.into_reputation(host)
    }
}
