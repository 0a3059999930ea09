//! Composite device rating
//!
//! Blends three counts (apps with ads, misconfigured settings, hidden apps)
//! into a 0-5 rating and a 0-100 percentage. Each count maps linearly onto a
//! 0-5 sub-score, reaching 0 at `OCCURRENCE_CAP` occurrences.

use super::inventory::{fetch_app_inventory, DeviceError};
use super::{audit_settings, DeviceCapabilities, SettingsAudit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Occurrences at which a sub-score bottoms out
pub const OCCURRENCE_CAP: u32 = 10;
pub const MAX_SUB_SCORE: f64 = 5.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid composite weights: {0}")]
pub struct InvalidWeights(pub String);

/// Relative weight of each sub-score
///
/// Always finite, non-negative and with a positive total; deserialized
/// values go through the same check as `new`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct CompositeWeights {
    ads: f64,
    security: f64,
    hidden: f64,
}

#[derive(Deserialize)]
struct RawWeights {
    ads: f64,
    security: f64,
    hidden: f64,
}

impl TryFrom<RawWeights> for CompositeWeights {
    type Error = InvalidWeights;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        Self::new(raw.ads, raw.security, raw.hidden)
    }
}

impl CompositeWeights {
    /// Settings and hidden apps count three times as much as ads
    pub const WEIGHTED: CompositeWeights = CompositeWeights {
        ads: 1.0,
        security: 3.0,
        hidden: 3.0,
    };

    pub const UNIFORM: CompositeWeights = CompositeWeights {
        ads: 1.0,
        security: 1.0,
        hidden: 1.0,
    };

    pub fn new(ads: f64, security: f64, hidden: f64) -> Result<Self, InvalidWeights> {
        let weights = Self {
            ads,
            security,
            hidden,
        };
        if [ads, security, hidden]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(InvalidWeights(format!(
                "weights must be finite and non-negative, got {}",
                weights
            )));
        }
        if weights.total() <= 0.0 {
            return Err(InvalidWeights("at least one weight must be positive".to_string()));
        }
        Ok(weights)
    }

    pub fn ads(&self) -> f64 {
        self.ads
    }

    pub fn security(&self) -> f64 {
        self.security
    }

    pub fn hidden(&self) -> f64 {
        self.hidden
    }

    pub fn total(&self) -> f64 {
        self.ads + self.security + self.hidden
    }
}

impl fmt::Display for CompositeWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.ads, self.security, self.hidden)
    }
}

/// Accepts `weighted`, `uniform` or three comma-separated numbers
impl FromStr for CompositeWeights {
    type Err = InvalidWeights;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weighted" => Ok(Self::WEIGHTED),
            "uniform" => Ok(Self::UNIFORM),
            other => {
                let parts = other
                    .split(',')
                    .map(|p| p.trim().parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| InvalidWeights(format!("{:?}: {}", s, e)))?;
                match parts.as_slice() {
                    [ads, security, hidden] => Self::new(*ads, *security, *hidden),
                    _ => Err(InvalidWeights(format!(
                        "expected `weighted`, `uniform` or `ads,security,hidden`, got {:?}",
                        s
                    ))),
                }
            }
        }
    }
}

/// Raw counts fed into the rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatingInputs {
    pub apps_with_ads: u32,
    /// Out of `SecurityCheck::ALL.len()`
    pub misconfigured_settings: u32,
    pub hidden_apps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceRating {
    pub ads_score: f64,
    pub security_score: f64,
    pub hidden_score: f64,
    /// Weighted average of the sub-scores, 0-5, higher is safer
    pub rating: f64,
    /// `rating` rescaled to 0-100
    pub percentage: f64,
}

impl DeviceRating {
    /// Inverse of `percentage`: 0 is a clean device
    pub fn risk_percent(&self) -> f64 {
        100.0 - self.percentage
    }
}

/// Map an occurrence count onto `[0, MAX_SUB_SCORE]`
pub fn sub_score(count: u32) -> f64 {
    let capped = count.min(OCCURRENCE_CAP) as f64;
    MAX_SUB_SCORE * (1.0 - capped / OCCURRENCE_CAP as f64)
}

pub fn composite_rating(inputs: &RatingInputs, weights: &CompositeWeights) -> DeviceRating {
    let ads_score = sub_score(inputs.apps_with_ads);
    let security_score = sub_score(inputs.misconfigured_settings);
    let hidden_score = sub_score(inputs.hidden_apps);

    let rating = (ads_score * weights.ads()
        + security_score * weights.security()
        + hidden_score * weights.hidden())
        / weights.total();

    DeviceRating {
        ads_score,
        security_score,
        hidden_score,
        rating,
        percentage: rating / MAX_SUB_SCORE * 100.0,
    }
}

/// Everything gathered for one device rating
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub audit: SettingsAudit,
    pub inputs: RatingInputs,
    pub rating: DeviceRating,
}

/// Audit settings, fetch the app inventory and rate the device
pub async fn rate_device(
    provider: &dyn DeviceCapabilities,
    weights: &CompositeWeights,
) -> Result<DeviceReport, DeviceError> {
    let (audit, inventory) = tokio::join!(audit_settings(provider), fetch_app_inventory(provider));
    let inventory = inventory?;

    let inputs = RatingInputs {
        apps_with_ads: inventory.apps_with_ads(),
        misconfigured_settings: audit.misconfigured_count(),
        hidden_apps: inventory.hidden_app_count(),
    };
    let rating = composite_rating(&inputs, weights);

    info!(
        apps_with_ads = inputs.apps_with_ads,
        misconfigured = inputs.misconfigured_settings,
        hidden_apps = inputs.hidden_apps,
        "Device rated {:.1}/5 ({:.0}%) with weights {}",
        rating.rating,
        rating.percentage,
        weights
    );

    Ok(DeviceReport {
        audit,
        inputs,
        rating,
    })
}
