//! Contract Test: Scan Orchestration
//!
//! Constraints verified:
//! - A scan walks every variation of every active keyword
//! - Unknown oracle answers leave stored state untouched
//! - Per-domain store failures do not abort the scan
//! - Store failures at snapshot or dispatch end the scan in Failed
//! - Notifier failures are non-fatal
//! - Overlapping scans are refused

mod common;

use common::*;
use domwatch_core::dispatch::NotificationOutcome;
use domwatch_core::engine::{ScanEvent, ScanOrchestrator, ScanState};
use domwatch_core::error::Error;
use domwatch_core::model::Availability;
use domwatch_core::state::MemoryStore;
use domwatch_core::traits::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn orchestrator(
    store: Arc<dyn Store>,
    oracle: &ScriptedOracle,
    notifier: &RecordingNotifier,
    extensions: &[&str],
) -> (ScanOrchestrator, mpsc::Receiver<ScanEvent>) {
    ScanOrchestrator::new(
        store,
        Arc::new(oracle.clone()),
        Arc::new(notifier.clone()),
        &minimal_config(extensions),
    )
    .expect("orchestrator construction succeeds")
}

fn drain(rx: &mut mpsc::Receiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn end_to_end_taken_then_regained_then_unchanged() {
    let store = Arc::new(MemoryStore::new());
    store.add_keyword("foo").await.unwrap();
    let oracle = ScriptedOracle::new(Availability::Taken);
    let notifier = RecordingNotifier::new();
    let (scanner, _events) = orchestrator(store.clone(), &oracle, &notifier, &[".com"]);

    // Scan 1: taken
    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.state, ScanState::Completed);
    assert_eq!(report.record.domains_found, 0);
    assert_eq!(report.record.keywords_scanned, 1);
    assert_eq!(report.notification, Some(NotificationOutcome::NothingToSend));
    let record = store.domain("foo.com").await.unwrap().unwrap();
    assert!(!record.available);
    assert!(!record.notified);

    // Scan 2: available again
    oracle.set("foo.com", Availability::Available);
    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.transitions.regained, 1);
    assert_eq!(report.record.domains_found, 1);
    assert_eq!(report.notification, Some(NotificationOutcome::Delivered { count: 1 }));
    assert_eq!(notifier.batches(), vec![vec![domwatch_core::AlertItem {
        domain: "foo.com".to_string(),
        keyword: "foo".to_string(),
    }]]);
    assert!(store.domain("foo.com").await.unwrap().unwrap().notified);

    // Scan 3: still available, already alerted
    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.transitions.no_change, 1);
    assert_eq!(report.record.domains_found, 1);
    assert_eq!(report.notification, Some(NotificationOutcome::NothingToSend));
    assert!(store.domain("foo.com").await.unwrap().unwrap().notified);
    assert_eq!(notifier.send_count(), 1);

    let history = store.scan_history(10).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|scan| scan.status == "Success"));
}

#[tokio::test]
async fn unknown_answers_are_skipped_entirely() {
    let store = Arc::new(MemoryStore::new());
    store.add_keyword("foo").await.unwrap();
    let oracle = ScriptedOracle::new(Availability::Unknown);
    oracle.set("foo.com", Availability::Available);
    let notifier = RecordingNotifier::new();
    let (scanner, mut events) = orchestrator(store.clone(), &oracle, &notifier, &[".com", ".net"]);

    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.transitions.unknown, 1);
    assert_eq!(report.available_found, 1);
    assert!(store.domain("foo.net").await.unwrap().is_none());
    assert!(drain(&mut events).contains(&ScanEvent::OracleUnknown {
        domain: "foo.net".to_string()
    }));

    // An Unknown answer for a known domain changes nothing either
    let before = store.domain("foo.com").await.unwrap().unwrap();
    oracle.set("foo.com", Availability::Unknown);
    scanner.run_scan().await.unwrap();
    assert_eq!(store.domain("foo.com").await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn persistence_failure_skips_only_that_domain() {
    let store = Arc::new(FlakyStore::new());
    store.add_keyword("foo").await.unwrap();
    store.fail_domain("foo.net");
    let oracle = ScriptedOracle::new(Availability::Available);
    let notifier = RecordingNotifier::new();
    let (scanner, _events) =
        orchestrator(store.clone(), &oracle, &notifier, &[".com", ".net", ".org"]);

    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.state, ScanState::Completed);
    assert_eq!(report.record.status, "Success");
    assert_eq!(report.transitions.failed, 1);
    assert_eq!(report.transitions.new_available, 2);
    // The raw counter ignores the persistence outcome
    assert_eq!(report.available_found, 3);
    assert_eq!(
        batch_domains(&notifier.batches()[0]),
        vec!["foo.com".to_string(), "foo.org".to_string()]
    );
}

#[tokio::test]
async fn empty_keyword_set_records_no_keywords() {
    let store = Arc::new(MemoryStore::new());
    let oracle = ScriptedOracle::new(Availability::Available);
    let notifier = RecordingNotifier::new();
    let (scanner, _events) = orchestrator(store.clone(), &oracle, &notifier, &[".com"]);

    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.state, ScanState::Completed);
    assert_eq!(report.record.status, "No keywords");
    assert_eq!(report.record.keywords_scanned, 0);
    assert_eq!(report.notification, None);
    assert_eq!(oracle.call_count(), 0);
    assert_eq!(notifier.send_count(), 0);
}

#[tokio::test]
async fn keyword_snapshot_failure_ends_in_failed() {
    let store = Arc::new(FlakyStore::new());
    store.add_keyword("foo").await.unwrap();
    store.fail_keywords(true);
    let oracle = ScriptedOracle::new(Availability::Available);
    let notifier = RecordingNotifier::new();
    let (scanner, mut events) = orchestrator(store.clone(), &oracle, &notifier, &[".com"]);

    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.state, ScanState::Failed);
    assert!(report.record.status.starts_with("Failed"));
    assert_eq!(oracle.call_count(), 0);
    assert!(
        drain(&mut events)
            .iter()
            .any(|e| matches!(e, ScanEvent::ScanFailed { .. }))
    );
    assert_eq!(store.scan_history(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn dispatch_selection_failure_keeps_reconciled_records() {
    let store = Arc::new(FlakyStore::new());
    store.add_keyword("foo").await.unwrap();
    store.fail_pending(true);
    let oracle = ScriptedOracle::new(Availability::Available);
    let notifier = RecordingNotifier::new();
    let (scanner, _events) = orchestrator(store.clone(), &oracle, &notifier, &[".com"]);

    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.state, ScanState::Failed);
    assert_eq!(report.record.domains_found, 1);
    // Nothing is rolled back
    assert!(store.domain("foo.com").await.unwrap().unwrap().available);
    assert_eq!(notifier.send_count(), 0);
}

#[tokio::test]
async fn notifier_failure_is_retried_next_scan() {
    let store = Arc::new(MemoryStore::new());
    store.add_keyword("foo").await.unwrap();
    let oracle = ScriptedOracle::new(Availability::Available);
    let notifier = RecordingNotifier::new();
    notifier.set_failing(true);
    let (scanner, _events) = orchestrator(store.clone(), &oracle, &notifier, &[".com", ".io"]);

    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.state, ScanState::Completed);
    assert_eq!(report.record.status, "Success");
    assert!(matches!(
        report.notification,
        Some(NotificationOutcome::Failed { count: 2, .. })
    ));

    notifier.set_failing(false);
    let report = scanner.run_scan().await.unwrap();
    assert_eq!(report.notification, Some(NotificationOutcome::Delivered { count: 2 }));
    assert!(store.pending_alerts().await.unwrap().is_empty());
}

#[tokio::test]
async fn results_are_reconciled_in_variation_order() {
    let store = Arc::new(MemoryStore::new());
    store.add_keyword("foo").await.unwrap();
    let oracle = ScriptedOracle::new(Availability::Taken).with_delay(Duration::from_millis(5));
    let notifier = RecordingNotifier::new();
    let extensions = [".com", ".net", ".org", ".io", ".co", ".ai"];
    let (scanner, mut events) = orchestrator(store.clone(), &oracle, &notifier, &extensions);

    scanner.run_scan().await.unwrap();

    let reconciled: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            ScanEvent::DomainReconciled { domain, .. } => Some(domain),
            _ => None,
        })
        .collect();
    let expected: Vec<String> = extensions.iter().map(|ext| format!("foo{}", ext)).collect();
    assert_eq!(reconciled, expected);
    assert_eq!(oracle.call_count(), extensions.len());
}

#[tokio::test]
async fn overlapping_scans_are_refused() {
    let store = Arc::new(MemoryStore::new());
    store.add_keyword("foo").await.unwrap();
    let oracle = ScriptedOracle::new(Availability::Taken).with_delay(Duration::from_millis(50));
    let notifier = RecordingNotifier::new();
    let (scanner, _events) = orchestrator(store.clone(), &oracle, &notifier, &[".com"]);

    let (first, second) = tokio::join!(scanner.run_scan(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        scanner.run_scan().await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(Error::ScanInProgress)));
    assert_eq!(store.scan_history(10).await.unwrap().len(), 1);
}
