//! Reputation Engine
//!
//! Runs the end-to-end URL flow (submit, resolve, normalize, classify) and
//! the domain flow (fetch reputation, grade).

use super::resolver::{PollPolicy, PollResolver};
use super::scorer::{assess_risk, classify_safety, ReputationAssessment, Safety};
use crate::intelligence::{
    DomainReputation, ReputationApiClient, ReputationSource, ScanApiClient, ScanBackend,
    ScanError, ScanReport,
};
use crate::{Config, ConfigError};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Outcome of a URL scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlVerdict {
    pub report: ScanReport,
    pub safety: Safety,
}

/// Outcome of a domain reputation check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainVerdict {
    pub reputation: DomainReputation,
    pub assessment: ReputationAssessment,
}

/// Coordinates scanning and scoring
///
/// Holds no per-scan state, so one engine can serve concurrent scans; each
/// call owns its handle and attempt budget.
pub struct ReputationEngine {
    backend: Arc<dyn ScanBackend>,
    reputation: Option<Arc<dyn ReputationSource>>,
    resolver: PollResolver,
}

impl ReputationEngine {
    pub fn new(backend: Arc<dyn ScanBackend>, policy: PollPolicy) -> Self {
        Self {
            backend,
            reputation: None,
            resolver: PollResolver::new(policy),
        }
    }

    pub fn with_reputation_source(mut self, source: Arc<dyn ReputationSource>) -> Self {
        self.reputation = Some(source);
        self
    }

    /// Build an engine backed by the HTTP clients
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let backend = ScanApiClient::from_config(config)?;
        let mut engine = Self::new(Arc::new(backend), config.poll);

        if let Some(endpoint) = &config.reputation_api {
            let client = ReputationApiClient::from_endpoint(endpoint, config.http_timeout)?;
            engine = engine.with_reputation_source(Arc::new(client));
        }

        Ok(engine)
    }

    /// Submit `url`, wait for the analysis and classify it
    pub async fn scan_url(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<UrlVerdict, ScanError> {
        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            handle = self.backend.submit(url) => handle?,
        };

        let report = self
            .resolver
            .resolve(self.backend.as_ref(), &handle, cancel)
            .await?
            .into_report()?;

        let safety = classify_safety(&report.stats);
        info!(
            scan_id = handle.scan_id(),
            malicious = report.stats.malicious,
            suspicious = report.stats.suspicious,
            "URL classified as {:?}",
            safety
        );

        Ok(UrlVerdict { report, safety })
    }

    /// Fetch and grade the reputation of `host`
    pub async fn check_domain(&self, host: &str) -> Result<DomainVerdict, ScanError> {
        let source = self.reputation.as_ref().ok_or_else(|| {
            ScanError::InvalidRequest("domain reputation source is not configured".to_string())
        })?;

        let reputation = source.domain_reputation(host).await?;
        let assessment = assess_risk(reputation.risk_score, reputation.detections);

        info!(
            host,
            security_score = assessment.security_score,
            "Domain graded {}",
            assessment.grade
        );

        Ok(DomainVerdict {
            reputation,
            assessment,
        })
    }
}
