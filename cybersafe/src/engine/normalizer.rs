//! Engine vote normalization

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Categorical verdict of a single detection engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Malicious,
    Suspicious,
    Undetected,
    Harmless,
    Timeout,
    /// Anything else the service reports (`type-unsupported`, `failure`, ...)
    #[serde(other)]
    Other,
}

/// Engine name to verdict
pub type EngineVotes = HashMap<String, Verdict>;

/// Per-category engine tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub undetected: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub timeout: u32,
}

impl ScanStats {
    /// Count one verdict; uncategorized verdicts are ignored
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Malicious => self.malicious += 1,
            Verdict::Suspicious => self.suspicious += 1,
            Verdict::Undetected => self.undetected += 1,
            Verdict::Harmless => self.harmless += 1,
            Verdict::Timeout => self.timeout += 1,
            Verdict::Other => {}
        }
    }

    /// Engines that flagged the URL
    pub fn detections(&self) -> u32 {
        self.malicious.saturating_add(self.suspicious)
    }

    /// Engines that found nothing
    pub fn clean(&self) -> u32 {
        self.harmless.saturating_add(self.undetected)
    }

    pub fn total_engines(&self) -> u32 {
        self.detections()
            .saturating_add(self.clean())
            .saturating_add(self.timeout)
    }
}

/// Tally engine votes into per-category counts
pub fn normalize<'a, I>(votes: I) -> ScanStats
where
    I: IntoIterator<Item = (&'a String, &'a Verdict)>,
{
    votes
        .into_iter()
        .fold(ScanStats::default(), |mut stats, (_, verdict)| {
            stats.record(*verdict);
            stats
        })
}
