//! URL scan API payloads
//!
//! Wire structures for `POST /urls` and `GET /analyses/{id}`.

use super::{PollOutcome, ScanHandle, ScanReport};
use crate::engine::normalizer::{normalize, ScanStats, Verdict};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Terminal analysis status reported by the service
pub const STATUS_COMPLETED: &str = "completed";

/// `POST /urls` response
#[derive(Debug, Deserialize)]
pub struct SubmissionResponse {
    pub data: Option<SubmissionData>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionData {
    pub id: String,
}

impl SubmissionResponse {
    pub fn into_handle(self) -> Option<ScanHandle> {
        self.data
            .map(|d| d.id)
            .filter(|id| !id.is_empty())
            .map(ScanHandle::new)
    }
}

/// `GET /analyses/{id}` response
#[derive(Debug, Deserialize)]
pub struct AnalysisResponse {
    pub data: AnalysisData,
    pub meta: Option<AnalysisMeta>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisData {
    pub attributes: AnalysisAttributes,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisAttributes {
    pub status: String,
    pub stats: Option<ScanStats>,
    #[serde(default)]
    pub results: HashMap<String, EngineResult>,
    /// Unix seconds at which the analysis finished
    pub date: Option<i64>,
}

/// Single engine verdict
#[derive(Debug, Deserialize)]
pub struct EngineResult {
    pub category: Verdict,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisMeta {
    pub url_info: Option<UrlInfo>,
}

#[derive(Debug, Deserialize)]
pub struct UrlInfo {
    pub url: Option<String>,
}

impl AnalysisResponse {
    pub fn is_completed(&self) -> bool {
        self.data.attributes.status == STATUS_COMPLETED
    }

    /// Map the payload onto a poll outcome for `handle`
    pub fn into_outcome(self, handle: &ScanHandle) -> PollOutcome {
        if !self.is_completed() {
            debug!(
                scan_id = handle.scan_id(),
                status = %self.data.attributes.status,
                "Analysis not finished"
            );
            return PollOutcome::Pending;
        }

        let attributes = self.data.attributes;
        let stats = match attributes.stats {
            Some(stats) => stats,
            None => normalize(attributes.results.iter().map(|(name, r)| (name, &r.category))),
        };

        let url = self.meta.and_then(|m| m.url_info).and_then(|u| u.url);
        let completed_at = attributes
            .date
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);

        PollOutcome::Terminal(ScanReport {
            scan_id: handle.scan_id().to_string(),
            url,
            stats,
            completed_at,
        })
    }
}

/// Error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn into_message(self) -> Option<String> {
        let body = self.error?;
        match (body.code, body.message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        }
    }
}
