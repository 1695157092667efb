//! Minimal embedding example for domwatch-core
//!
//! This example runs the monitor inside a host application with an
//! in-memory store, a canned oracle and a console notifier. Nothing touches
//! the network.

use async_trait::async_trait;
use domwatch_core::config::MonitorConfig;
use domwatch_core::engine::ScanOrchestrator;
use domwatch_core::{
    AlertItem, Availability, AvailabilityOracle, DeliveryReport, MailSettings, MemoryStore,
    Monitor, Notifier, Result, Store, keywords,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Oracle that answers from a fixed set of free names
struct CannedOracle {
    free: Mutex<HashSet<String>>,
}

impl CannedOracle {
    fn new(free: &[&str]) -> Self {
        Self {
            free: Mutex::new(free.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// Simulate someone registering a name
    fn register(&self, domain: &str) {
        if let Ok(mut free) = self.free.lock() {
            free.remove(domain);
        }
    }
}

#[async_trait]
impl AvailabilityOracle for CannedOracle {
    async fn check(&self, domain: &str) -> Availability {
        match self.free.lock() {
            Ok(free) if free.contains(domain) => Availability::Available,
            Ok(_) => Availability::Taken,
            Err(_) => Availability::Unknown,
        }
    }

    fn oracle_name(&self) -> &'static str {
        "canned"
    }
}

/// Notifier that prints the batch instead of mailing it
struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_batch(&self, settings: &MailSettings, items: &[AlertItem]) -> DeliveryReport {
        println!("[Embedded] Alert for {} -> {}", settings.to, items.len());
        for item in items {
            println!("[Embedded]   {} (keyword: {})", item.domain, item.keyword);
        }
        DeliveryReport::Delivered
    }

    fn notifier_name(&self) -> &'static str {
        "console"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut config = MonitorConfig::new();
    config.scan.extensions = vec![".com".to_string(), ".io".to_string(), ".dev".to_string()];
    config.mail = MailSettings {
        username: "alerts@example.com".to_string(),
        password: "not-used".to_string(),
        to: "owner@example.com".to_string(),
        ..MailSettings::default()
    };
    config.validate()?;

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    keywords::add_keywords(store.as_ref(), ["Rocket Ship", "acme"]).await?;

    let oracle = Arc::new(CannedOracle::new(&["rocketship.io", "rocketship.dev", "acme.dev"]));
    let (orchestrator, _events) = ScanOrchestrator::new(
        Arc::clone(&store),
        oracle.clone(),
        Arc::new(ConsoleNotifier),
        &config,
    )?;

    // First pass alerts every free name once
    let first = orchestrator.run_scan().await?;
    println!(
        "[Embedded] First scan: {} available, {:?}",
        first.available_found, first.notification
    );

    // Second pass finds the same names but sends nothing
    let second = orchestrator.run_scan().await?;
    println!(
        "[Embedded] Second scan: {} available, {:?}",
        second.available_found, second.notification
    );

    // A name that gets registered drops out of the available list
    oracle.register("acme.dev");

    let (monitor, handle) = Monitor::new(Arc::new(orchestrator), Duration::from_secs(3600));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let worker = tokio::spawn(monitor.run_with_shutdown(Some(shutdown_rx)));

    // AlreadyRunning if the first scheduled pass has already started
    println!("[Embedded] Manual trigger: {:?}", handle.start_scan());
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = handle.status().await?;
    println!(
        "[Embedded] {} keyword(s), {} domain(s) available",
        status.keyword_count, status.available_domain_count
    );

    for listing in store.available_domains(50).await? {
        println!(
            "[Embedded]   {} (keyword: {})",
            listing.record.domain, listing.keyword
        );
    }

    let _ = shutdown_tx.send(());
    if let Ok(result) = worker.await {
        result?;
    }

    for scan in store.scan_history(10).await? {
        println!(
            "[Embedded] Scan #{}: {} keyword(s), {} found, {}",
            scan.id, scan.keywords_scanned, scan.domains_found, scan.status
        );
    }

    Ok(())
}
