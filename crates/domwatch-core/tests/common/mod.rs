//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that verify behavioral
//! contracts without touching the network or the disk.

#![allow(dead_code)]

use async_trait::async_trait;
use domwatch_core::config::MonitorConfig;
use domwatch_core::error::{Error, Result};
use domwatch_core::model::{
    AlertItem, Availability, DeliveryReport, DomainId, DomainListing, DomainRecord, Keyword,
    KeywordId, Observation, PendingAlert, ScanRecord, ScanSummary,
};
use domwatch_core::reconcile::Reconciled;
use domwatch_core::settings::MailSettings;
use domwatch_core::state::MemoryStore;
use domwatch_core::traits::{AvailabilityOracle, Notifier, Store};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An oracle whose answers are set by the test
///
/// Domains without a scripted answer come back as `default`.
#[derive(Clone)]
pub struct ScriptedOracle {
    answers: Arc<Mutex<HashMap<String, Availability>>>,
    default: Availability,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedOracle {
    pub fn new(default: Availability) -> Self {
        Self {
            answers: Arc::new(Mutex::new(HashMap::new())),
            default,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every check take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Script the answer for one domain
    pub fn set(&self, domain: &str, availability: Availability) {
        self.answers
            .lock()
            .unwrap()
            .insert(domain.to_string(), availability);
    }

    /// Get the number of times check() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvailabilityOracle for ScriptedOracle {
    async fn check(&self, domain: &str) -> Availability {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answers
            .lock()
            .unwrap()
            .get(domain)
            .copied()
            .unwrap_or(self.default)
    }

    fn oracle_name(&self) -> &'static str {
        "scripted"
    }
}

/// A notifier that records every batch it receives
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    batches: Arc<Mutex<Vec<Vec<AlertItem>>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Every batch handed to send_batch(), delivered or not
    pub fn batches(&self) -> Vec<Vec<AlertItem>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_batch(&self, _settings: &MailSettings, items: &[AlertItem]) -> DeliveryReport {
        self.batches.lock().unwrap().push(items.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            DeliveryReport::Failed("relay rejected the message".to_string())
        } else {
            DeliveryReport::Delivered
        }
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// A MemoryStore with switchable faults
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_domains: Arc<Mutex<HashSet<String>>>,
    fail_keywords: Arc<AtomicBool>,
    fail_pending: Arc<AtomicBool>,
    fail_mark: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject reconciliation of one domain
    pub fn fail_domain(&self, domain: &str) {
        self.failing_domains
            .lock()
            .unwrap()
            .insert(domain.to_string());
    }

    /// Reject keyword snapshots
    pub fn fail_keywords(&self, failing: bool) {
        self.fail_keywords.store(failing, Ordering::SeqCst);
    }

    /// Reject pending-alert selection
    pub fn fail_pending(&self, failing: bool) {
        self.fail_pending.store(failing, Ordering::SeqCst);
    }

    /// Reject mark_notified
    pub fn fail_mark(&self, failing: bool) {
        self.fail_mark.store(failing, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(Error::persistence(format!("{} unavailable", what)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn add_keyword(&self, text: &str) -> Result<KeywordId> {
        self.inner.add_keyword(text).await
    }

    async fn active_keywords(&self) -> Result<Vec<Keyword>> {
        Self::check(&self.fail_keywords, "keywords")?;
        self.inner.active_keywords().await
    }

    async fn deactivate_keyword(&self, id: KeywordId) -> Result<bool> {
        self.inner.deactivate_keyword(id).await
    }

    async fn domain(&self, domain: &str) -> Result<Option<DomainRecord>> {
        self.inner.domain(domain).await
    }

    async fn reconcile_domain(&self, observation: &Observation) -> Result<Reconciled> {
        if self
            .failing_domains
            .lock()
            .unwrap()
            .contains(&observation.domain)
        {
            return Err(Error::persistence(format!(
                "write of {} rejected",
                observation.domain
            )));
        }
        self.inner.reconcile_domain(observation).await
    }

    async fn available_domains(&self, limit: usize) -> Result<Vec<DomainListing>> {
        self.inner.available_domains(limit).await
    }

    async fn all_domains(&self, limit: usize) -> Result<Vec<DomainListing>> {
        self.inner.all_domains(limit).await
    }

    async fn count_available(&self) -> Result<usize> {
        self.inner.count_available().await
    }

    async fn pending_alerts(&self) -> Result<Vec<PendingAlert>> {
        Self::check(&self.fail_pending, "pending alerts")?;
        self.inner.pending_alerts().await
    }

    async fn mark_notified(&self, ids: &[DomainId]) -> Result<usize> {
        Self::check(&self.fail_mark, "mark notified")?;
        self.inner.mark_notified(ids).await
    }

    async fn record_scan(&self, summary: &ScanSummary) -> Result<ScanRecord> {
        self.inner.record_scan(summary).await
    }

    async fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        self.inner.scan_history(limit).await
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_setting(key).await
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        self.inner.save_setting(key, value).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.inner.clear_all().await
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }
}

/// Mail settings that pass the "configured" check
pub fn configured_mail() -> MailSettings {
    MailSettings {
        server: "smtp.example.com".to_string(),
        port: 587,
        username: "alerts@example.com".to_string(),
        password: "secret".to_string(),
        from: String::new(),
        to: "owner@example.com".to_string(),
    }
}

/// Create a minimal valid config probing `extensions`, with mail configured
pub fn minimal_config(extensions: &[&str]) -> MonitorConfig {
    let mut config = MonitorConfig::new();
    config.scan.extensions = extensions.iter().map(|s| s.to_string()).collect();
    config.mail = configured_mail();
    config
}

/// Domains of a batch, in batch order
pub fn batch_domains(batch: &[AlertItem]) -> Vec<String> {
    batch.iter().map(|item| item.domain.clone()).collect()
}
