//! Installed app inventory
//!
//! The installed-app list and the ad-service list come from two independent
//! host calls; they are fetched concurrently and joined.

use super::{CapabilityError, DeviceCapabilities};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Failed to list installed apps: {0}")]
    InstalledApps(CapabilityError),
    #[error("Failed to list ad services: {0}")]
    AdServices(CapabilityError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub package_name: String,
    pub label: String,
    pub is_system: bool,
    /// Whether the app shows up in the launcher
    pub has_launcher_entry: bool,
}

impl InstalledApp {
    /// User-installed app with no launcher icon
    pub fn is_hidden(&self) -> bool {
        !self.is_system && !self.has_launcher_entry
    }
}

/// Ad SDK services declared by one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdServiceEntry {
    pub package_name: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppInventory {
    pub installed: Vec<InstalledApp>,
    pub ad_services: Vec<AdServiceEntry>,
}

impl AppInventory {
    /// Distinct packages declaring at least one ad service
    pub fn apps_with_ads(&self) -> u32 {
        self.ad_services
            .iter()
            .filter(|entry| !entry.services.is_empty())
            .map(|entry| entry.package_name.as_str())
            .collect::<HashSet<_>>()
            .len() as u32
    }

    pub fn hidden_apps(&self) -> impl Iterator<Item = &InstalledApp> {
        self.installed.iter().filter(|app| app.is_hidden())
    }

    pub fn hidden_app_count(&self) -> u32 {
        self.hidden_apps().count() as u32
    }
}

/// Fetch installed apps and ad services in parallel
pub async fn fetch_app_inventory(
    provider: &dyn DeviceCapabilities,
) -> Result<AppInventory, DeviceError> {
    let (installed, ad_services) = tokio::try_join!(
        async {
            provider
                .installed_apps()
                .await
                .map_err(DeviceError::InstalledApps)
        },
        async {
            provider
                .ad_services()
                .await
                .map_err(DeviceError::AdServices)
        },
    )?;

    debug!(
        installed = installed.len(),
        ad_packages = ad_services.len(),
        "App inventory fetched"
    );

    Ok(AppInventory {
        installed,
        ad_services,
    })
}
