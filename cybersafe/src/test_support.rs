//! Scripted collaborators shared by the unit tests

use crate::device::{
    AdServiceEntry, CapabilityError, DeviceCapabilities, InstalledApp, SecurityCheck,
};
use crate::engine::normalizer::ScanStats;
use crate::intelligence::{
    DomainReputation, PollOutcome, ReputationSource, ScanBackend, ScanError, ScanHandle,
    ScanReport,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

pub fn completed_report(
    scan_id: &str,
    malicious: u32,
    suspicious: u32,
    undetected: u32,
    harmless: u32,
) -> ScanReport {
    ScanReport {
        scan_id: scan_id.to_string(),
        url: Some("http://example.com/".to_string()),
        stats: ScanStats {
            malicious,
            suspicious,
            undetected,
            harmless,
            timeout: 0,
        },
        completed_at: chrono::Utc::now(),
    }
}

/// One scripted poll answer
#[derive(Debug, Clone)]
pub enum Step {
    Pending,
    Completed(ScanReport),
    Transport,
    NotFound,
}

impl Step {
    fn into_outcome(self) -> PollOutcome {
        match self {
            Step::Pending => PollOutcome::Pending,
            Step::Completed(report) => PollOutcome::Terminal(report),
            Step::Transport => PollOutcome::Error(ScanError::Transport("connection reset".into())),
            Step::NotFound => PollOutcome::Error(ScanError::Upstream {
                status: 404,
                message: "NotFoundError".into(),
            }),
        }
    }
}

/// Scan backend answering polls from a script, then from a fallback step
pub struct ScriptedBackend {
    scan_id: String,
    fail_submission: bool,
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<Step>,
    polls: AtomicU32,
    submitted: Mutex<Vec<String>>,
    polled_ids: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            scan_id: "scan-1".to_string(),
            fail_submission: false,
            steps: Mutex::new(steps.into()),
            fallback: None,
            polls: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
            polled_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(Vec::new()).then_always(step)
    }

    pub fn then_always(mut self, step: Step) -> Self {
        self.fallback = Some(step);
        self
    }

    pub fn with_scan_id(mut self, scan_id: &str) -> Self {
        self.scan_id = scan_id.to_string();
        self
    }

    pub fn failing_submission(mut self) -> Self {
        self.fail_submission = true;
        self
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanBackend for ScriptedBackend {
    async fn submit(&self, url: &str) -> Result<ScanHandle, ScanError> {
        self.submitted.lock().unwrap().push(url.to_string());
        if self.fail_submission {
            return Err(ScanError::Submission("HTTP 400: BadRequestError".into()));
        }
        Ok(ScanHandle::new(self.scan_id.clone()))
    }

    async fn poll(&self, handle: &ScanHandle) -> PollOutcome {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.polled_ids
            .lock()
            .unwrap()
            .push(handle.scan_id().to_string());

        let next = self.steps.lock().unwrap().pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(step) => step.into_outcome(),
            None => panic!("poll script exhausted"),
        }
    }
}

/// Reputation source returning a fixed answer
pub struct FixedReputation {
    risk_score: u32,
    detections: u32,
}

impl FixedReputation {
    pub fn new(risk_score: u32, detections: u32) -> Self {
        Self {
            risk_score,
            detections,
        }
    }
}

#[async_trait]
impl ReputationSource for FixedReputation {
    async fn domain_reputation(&self, host: &str) -> Result<DomainReputation, ScanError> {
        Ok(DomainReputation {
            host: host.to_string(),
            risk_score: self.risk_score,
            detections: self.detections,
            domain_age_years: Some(3.0),
            country: Some("India".to_string()),
        })
    }
}

pub fn app(package_name: &str, is_system: bool, has_launcher_entry: bool) -> InstalledApp {
    InstalledApp {
        package_name: package_name.to_string(),
        label: package_name.rsplit('.').next().unwrap_or(package_name).to_string(),
        is_system,
        has_launcher_entry,
    }
}

pub fn ads(package_name: &str, services: &[&str]) -> AdServiceEntry {
    AdServiceEntry {
        package_name: package_name.to_string(),
        services: services.iter().map(|s| s.to_string()).collect(),
    }
}

/// In-memory device; every check passes unless configured otherwise
#[derive(Default)]
pub struct FakeDevice {
    checks: HashMap<SecurityCheck, Result<bool, CapabilityError>>,
    apps: Vec<InstalledApp>,
    ad_services: Vec<AdServiceEntry>,
    apps_error: Option<CapabilityError>,
    ad_services_error: Option<CapabilityError>,
}

impl FakeDevice {
    pub fn misconfigured(mut self, check: SecurityCheck) -> Self {
        self.checks.insert(check, Ok(true));
        self
    }

    pub fn failing(mut self, check: SecurityCheck, error: CapabilityError) -> Self {
        self.checks.insert(check, Err(error));
        self
    }

    pub fn with_apps(mut self, apps: Vec<InstalledApp>) -> Self {
        self.apps = apps;
        self
    }

    pub fn with_ad_services(mut self, ad_services: Vec<AdServiceEntry>) -> Self {
        self.ad_services = ad_services;
        self
    }

    pub fn failing_apps(mut self, error: CapabilityError) -> Self {
        self.apps_error = Some(error);
        self
    }

    pub fn failing_ad_services(mut self, error: CapabilityError) -> Self {
        self.ad_services_error = Some(error);
        self
    }

    fn check(&self, check: SecurityCheck) -> Result<bool, CapabilityError> {
        self.checks.get(&check).cloned().unwrap_or(Ok(false))
    }
}

#[async_trait]
impl DeviceCapabilities for FakeDevice {
    async fn is_rooted(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::Rooted)
    }

    async fn is_usb_debugging_enabled(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::UsbDebugging)
    }

    async fn is_developer_mode_enabled(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::DeveloperOptions)
    }

    async fn allows_unknown_sources(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::UnknownSources)
    }

    async fn is_screen_lock_missing(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::ScreenLockMissing)
    }

    async fn is_storage_unencrypted(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::StorageUnencrypted)
    }

    async fn is_bluetooth_discoverable(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::BluetoothDiscoverable)
    }

    async fn is_nfc_enabled(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::NfcEnabled)
    }

    async fn is_on_open_wifi(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::OpenWifi)
    }

    async fn is_security_patch_outdated(&self) -> Result<bool, CapabilityError> {
        self.check(SecurityCheck::OutdatedSecurityPatch)
    }

    async fn installed_apps(&self) -> Result<Vec<InstalledApp>, CapabilityError> {
        match &self.apps_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.apps.clone()),
        }
    }

    async fn ad_services(&self) -> Result<Vec<AdServiceEntry>, CapabilityError> {
        match &self.ad_services_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.ad_services.clone()),
        }
    }
}
