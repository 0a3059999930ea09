//! MahaCyberSafe - security awareness core
//!
//! URL reputation scanning (submit, poll, normalize, score), domain
//! reputation grading and a composite device rating built on top of an
//! injected host capability provider.

pub mod device;
pub mod engine;
pub mod intelligence;
pub mod logging;

#[cfg(test)]
pub(crate) mod test_support;

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Re-export commonly used types
pub use device::rating::{CompositeWeights, DeviceRating};
pub use device::{CapabilityError, DeviceCapabilities};
pub use engine::reputation_engine::{DomainVerdict, ReputationEngine, UrlVerdict};
pub use engine::resolver::{PollPolicy, ScanStatus};
pub use engine::scorer::{Grade, ReputationAssessment, ReputationStatus, Safety};
pub use intelligence::{ScanError, ScanHandle, ScanReport};
pub use logging::{init_logging, LogConfig};

pub const DEFAULT_SCAN_BASE_URL: &str = "https://www.virustotal.com/api/v3";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration source error: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Base URL and key for one upstream API
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl ApiEndpoint {
    /// The API key, or an error naming the variable that should carry it
    pub fn require_key(&self, var: &'static str) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing(var))
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub scan_api: ApiEndpoint,
    pub reputation_api: Option<ApiEndpoint>,
    pub poll: PollPolicy,
    pub http_timeout: Duration,
    /// No default: the authoritative weighting has to be named explicitly.
    pub composite_weights: Option<CompositeWeights>,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_api: ApiEndpoint {
                base_url: DEFAULT_SCAN_BASE_URL.to_string(),
                api_key: None,
            },
            reputation_api: None,
            poll: PollPolicy::default(),
            http_timeout: Duration::from_secs(30),
            composite_weights: None,
            log: LogConfig::default(),
        }
    }
}

/// Flat view of the `CYBERSAFE_*` environment
///
/// `CYBERSAFE_POLL_ATTEMPTS` lands in `poll_attempts`, and so on.
#[derive(Debug, Default, Deserialize)]
struct EnvConfig {
    scan_api_key: Option<String>,
    scan_base_url: Option<String>,
    reputation_api_key: Option<String>,
    reputation_base_url: Option<String>,
    poll_attempts: Option<u32>,
    poll_interval_ms: Option<u64>,
    http_timeout_secs: Option<u64>,
    composite_weights: Option<String>,
    log_dir: Option<PathBuf>,
}

impl Config {
    pub const ENV_PREFIX: &'static str = "CYBERSAFE";

    pub const SCAN_API_KEY: &'static str = "CYBERSAFE_SCAN_API_KEY";
    pub const SCAN_BASE_URL: &'static str = "CYBERSAFE_SCAN_BASE_URL";
    pub const REPUTATION_API_KEY: &'static str = "CYBERSAFE_REPUTATION_API_KEY";
    pub const REPUTATION_BASE_URL: &'static str = "CYBERSAFE_REPUTATION_BASE_URL";
    pub const POLL_ATTEMPTS: &'static str = "CYBERSAFE_POLL_ATTEMPTS";
    pub const POLL_INTERVAL_MS: &'static str = "CYBERSAFE_POLL_INTERVAL_MS";
    pub const HTTP_TIMEOUT_SECS: &'static str = "CYBERSAFE_HTTP_TIMEOUT_SECS";
    pub const COMPOSITE_WEIGHTS: &'static str = "CYBERSAFE_COMPOSITE_WEIGHTS";
    pub const LOG_DIR: &'static str = "CYBERSAFE_LOG_DIR";

    /// Load configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self, ConfigError> {
        Self::load_from(Some(vars))
    }

    fn load_from(vars: Option<config::Map<String, String>>) -> Result<Self, ConfigError> {
        let env: EnvConfig = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .ignore_empty(true)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        let config = Self::from_env_config(env)?;
        config.validate()?;
        Ok(config)
    }

    fn from_env_config(env: EnvConfig) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(base_url) = env.scan_base_url {
            config.scan_api.base_url = base_url;
        }
        config.scan_api.api_key = env.scan_api_key;

        if let Some(base_url) = env.reputation_base_url {
            config.reputation_api = Some(ApiEndpoint {
                base_url,
                api_key: env.reputation_api_key,
            });
        }

        if let Some(attempts) = env.poll_attempts {
            config.poll.max_attempts = attempts;
        }
        if let Some(ms) = env.poll_interval_ms {
            config.poll.interval = Duration::from_millis(ms);
        }
        if let Some(secs) = env.http_timeout_secs {
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = env.composite_weights {
            let weights = raw.parse::<CompositeWeights>().map_err(|e| ConfigError::Invalid {
                var: Self::COMPOSITE_WEIGHTS,
                reason: e.to_string(),
            })?;
            config.composite_weights = Some(weights);
        }

        if let Some(dir) = env.log_dir {
            config.log.directory = Some(dir);
        }

        Ok(config)
    }

    /// Reject values that would make every scan fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: Self::POLL_ATTEMPTS,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: Self::HTTP_TIMEOUT_SECS,
                reason: "must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}
