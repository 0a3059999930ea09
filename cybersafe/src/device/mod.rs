//! Device security checks
//!
//! The host platform performs the actual checks (root detection, USB
//! debugging, ...). This module only defines the capability interface the
//! host implements and the audit that runs over it.

pub mod inventory;
pub mod rating;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use inventory::{fetch_app_inventory, AdServiceEntry, AppInventory, DeviceError, InstalledApp};
pub use rating::{composite_rating, rate_device, CompositeWeights, DeviceRating, DeviceReport};

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityError {
    #[error("Check is not supported on this device")]
    Unsupported,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Check failed: {0}")]
    CheckFailed(String),
}

/// Host-provided device capabilities
///
/// Every check answers "is this setting in its risky state?": `Ok(true)`
/// means misconfigured.
#[async_trait]
pub trait DeviceCapabilities: Send + Sync {
    async fn is_rooted(&self) -> Result<bool, CapabilityError>;
    async fn is_usb_debugging_enabled(&self) -> Result<bool, CapabilityError>;
    async fn is_developer_mode_enabled(&self) -> Result<bool, CapabilityError>;
    async fn allows_unknown_sources(&self) -> Result<bool, CapabilityError>;
    async fn is_screen_lock_missing(&self) -> Result<bool, CapabilityError>;
    async fn is_storage_unencrypted(&self) -> Result<bool, CapabilityError>;
    async fn is_bluetooth_discoverable(&self) -> Result<bool, CapabilityError>;
    async fn is_nfc_enabled(&self) -> Result<bool, CapabilityError>;
    async fn is_on_open_wifi(&self) -> Result<bool, CapabilityError>;
    async fn is_security_patch_outdated(&self) -> Result<bool, CapabilityError>;

    async fn installed_apps(&self) -> Result<Vec<InstalledApp>, CapabilityError>;
    async fn ad_services(&self) -> Result<Vec<AdServiceEntry>, CapabilityError>;
}

/// Security settings covered by the audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCheck {
    Rooted,
    UsbDebugging,
    DeveloperOptions,
    UnknownSources,
    ScreenLockMissing,
    StorageUnencrypted,
    BluetoothDiscoverable,
    NfcEnabled,
    OpenWifi,
    OutdatedSecurityPatch,
}

impl SecurityCheck {
    pub const ALL: [SecurityCheck; 10] = [
        SecurityCheck::Rooted,
        SecurityCheck::UsbDebugging,
        SecurityCheck::DeveloperOptions,
        SecurityCheck::UnknownSources,
        SecurityCheck::ScreenLockMissing,
        SecurityCheck::StorageUnencrypted,
        SecurityCheck::BluetoothDiscoverable,
        SecurityCheck::NfcEnabled,
        SecurityCheck::OpenWifi,
        SecurityCheck::OutdatedSecurityPatch,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            SecurityCheck::Rooted => "Device is rooted",
            SecurityCheck::UsbDebugging => "USB debugging is enabled",
            SecurityCheck::DeveloperOptions => "Developer options are enabled",
            SecurityCheck::UnknownSources => "Installs from unknown sources are allowed",
            SecurityCheck::ScreenLockMissing => "No screen lock is set",
            SecurityCheck::StorageUnencrypted => "Storage is not encrypted",
            SecurityCheck::BluetoothDiscoverable => "Bluetooth is discoverable",
            SecurityCheck::NfcEnabled => "NFC is enabled",
            SecurityCheck::OpenWifi => "Connected to an open Wi-Fi network",
            SecurityCheck::OutdatedSecurityPatch => "Security patch level is outdated",
        }
    }

    /// Run this check against `provider`
    pub async fn run(&self, provider: &dyn DeviceCapabilities) -> Result<bool, CapabilityError> {
        match self {
            SecurityCheck::Rooted => provider.is_rooted().await,
            SecurityCheck::UsbDebugging => provider.is_usb_debugging_enabled().await,
            SecurityCheck::DeveloperOptions => provider.is_developer_mode_enabled().await,
            SecurityCheck::UnknownSources => provider.allows_unknown_sources().await,
            SecurityCheck::ScreenLockMissing => provider.is_screen_lock_missing().await,
            SecurityCheck::StorageUnencrypted => provider.is_storage_unencrypted().await,
            SecurityCheck::BluetoothDiscoverable => provider.is_bluetooth_discoverable().await,
            SecurityCheck::NfcEnabled => provider.is_nfc_enabled().await,
            SecurityCheck::OpenWifi => provider.is_on_open_wifi().await,
            SecurityCheck::OutdatedSecurityPatch => provider.is_security_patch_outdated().await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed,
    Misconfigured,
    Failed(CapabilityError),
}

/// Result of running every security check
#[derive(Debug, Clone, Serialize)]
pub struct SettingsAudit {
    pub outcomes: Vec<(SecurityCheck, CheckOutcome)>,
}

impl SettingsAudit {
    /// Number of misconfigured settings, at most `SecurityCheck::ALL.len()`
    pub fn misconfigured_count(&self) -> u32 {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == CheckOutcome::Misconfigured)
            .count() as u32
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &SecurityCheck> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, CheckOutcome::Failed(_)))
            .map(|(check, _)| check)
    }

    pub fn outcome(&self, check: SecurityCheck) -> Option<&CheckOutcome> {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == check)
            .map(|(_, outcome)| outcome)
    }
}

/// Run all security checks; a failing check is recorded, not propagated
pub async fn audit_settings(provider: &dyn DeviceCapabilities) -> SettingsAudit {
    let mut outcomes = Vec::with_capacity(SecurityCheck::ALL.len());

    for check in SecurityCheck::ALL {
        let outcome = match check.run(provider).await {
            Ok(true) => {
                debug!("{}", check.description());
                CheckOutcome::Misconfigured
            }
            Ok(false) => CheckOutcome::Passed,
            Err(e) => {
                warn!("Security check {:?} failed: {}", check, e);
                CheckOutcome::Failed(e)
            }
        };
        outcomes.push((check, outcome));
    }

    SettingsAudit { outcomes }
}
