//! Reputation scoring
//!
//! Two independent scorers:
//! - stats based: clean votes must outweigh flagged votes 10:1
//! - risk-score based: security score, letter grade, status and synopsis

use super::normalizer::ScanStats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clean votes required per flagged vote for a URL to count as safe
pub const SAFETY_MARGIN: u64 = 10;

/// Stats-based classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Safety {
    Safe,
    Unsafe,
}

/// Classify scan stats: safe when `harmless + undetected >= 10 * (malicious + suspicious)`
pub fn classify_safety(stats: &ScanStats) -> Safety {
    let clean = stats.harmless as u64 + stats.undetected as u64;
    let flagged = stats.malicious as u64 + stats.suspicious as u64;

    if clean >= SAFETY_MARGIN * flagged {
        Safety::Safe
    } else {
        Safety::Unsafe
    }
}

/// Letter grade of a security score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(security_score: u32) -> Self {
        if security_score >= 90 {
            Grade::A
        } else if security_score >= 80 {
            Grade::B
        } else if security_score >= 70 {
            Grade::C
        } else if security_score >= 60 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationStatus {
    Safe,
    Moderate,
    Unsafe,
}

/// Human-readable summary shown with an assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synopsis {
    pub short: String,
    pub long: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReputationAssessment {
    /// 0-100, higher is safer
    pub security_score: u32,
    pub grade: Grade,
    pub status: ReputationStatus,
    pub synopsis: Synopsis,
}

/// Convert an upstream risk score (0-100, higher is riskier) to a security score
pub fn security_score(risk_score: u32) -> u32 {
    100 - risk_score.min(100)
}

/// Grade a risk score and blacklist detection count
pub fn assess_risk(risk_score: u32, detections: u32) -> ReputationAssessment {
    let risk_score = risk_score.min(100);
    let security_score = security_score(risk_score);
    let grade = Grade::from_score(security_score);

    let (status, synopsis) = if detections == 0 && security_score >= 85 {
        (
            ReputationStatus::Safe,
            Synopsis {
                short: "Safe to visit".to_string(),
                long: format!(
                    "No blacklist flagged this site and its risk score is {}/100. It appears safe to visit.",
                    risk_score
                ),
            },
        )
    } else if security_score >= 65 {
        (
            ReputationStatus::Moderate,
            Synopsis {
                short: "Proceed with caution".to_string(),
                long: format!(
                    "This site has a moderate risk score of {}/100 with {} blacklist detection(s). \
                     Avoid entering passwords or payment details.",
                    risk_score, detections
                ),
            },
        )
    } else if security_score > 30 {
        (
            ReputationStatus::Unsafe,
            Synopsis {
                short: "Potentially dangerous".to_string(),
                long: format!(
                    "This site is potentially dangerous: risk score {}/100 with {} blacklist detection(s). \
                     We recommend not visiting it.",
                    risk_score, detections
                ),
            },
        )
    } else {
        (
            ReputationStatus::Unsafe,
            Synopsis {
                short: "Malicious".to_string(),
                long: format!(
                    "This site is confirmed malicious: risk score {}/100 with {} blacklist detection(s). \
                     Do not visit it or enter any information.",
                    risk_score, detections
                ),
            },
        )
    };

    ReputationAssessment {
        security_score,
        grade,
        status,
        synopsis,
    }
}
