//! Scan engine
//!
//! The ScanOrchestrator is responsible for:
//! - Snapshotting the active keyword set
//! - Expanding each keyword into its domain variations
//! - Querying the availability oracle with bounded parallelism
//! - Reconciling every definite answer, one domain at a time
//! - Dispatching pending alerts and recording the scan
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────┐
//!   Monitor ──────▶│ ScanOrchestrator │──── ScanEvent ────▶ (events)
//!  (trigger)       └──────────────────┘
//!                           │
//!       ┌──────────────┬────┴─────────┬───────────────┐
//!       │              │              │               │
//!       ▼              ▼              ▼               ▼
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌────────────┐
//! │  Store   │   │  Oracle  │   │ Reconciler │   │ Dispatcher │
//! │(keywords)│   │ (check)  │   │(transition)│   │(batch+mark)│
//! └──────────┘   └──────────┘   └────────────┘   └────────────┘
//! ```
//!
//! ## Scan Lifecycle
//!
//! `Idle -> Running -> {Completed, Failed}`. Every pass ends with exactly one
//! [`ScanRecord`] unless the store itself is unreachable when recording.

mod monitor;

pub use monitor::{Monitor, MonitorHandle, TriggerAck};

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::dispatch::{NotificationDispatcher, NotificationOutcome};
use crate::error::{Error, Result};
use crate::model::{Availability, Keyword, MonitorStatus, ScanRecord, ScanSummary, TransitionKind};
use crate::reconcile::Reconciler;
use crate::traits::{AvailabilityOracle, Notifier, Store};
use crate::variations::generate_variations;

/// Status text of a scan that ran to completion
pub const STATUS_SUCCESS: &str = "Success";
/// Status text of a scan that found no active keyword
pub const STATUS_NO_KEYWORDS: &str = "No keywords";

/// Events emitted by the ScanOrchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Scan entered Running with this many keywords
    ScanStarted { keywords: usize },

    /// A definite observation was persisted
    DomainReconciled {
        domain: String,
        transition: TransitionKind,
    },

    /// The oracle could not decide; the domain was skipped
    OracleUnknown { domain: String },

    /// Persisting an observation failed; the domain was skipped
    ReconcileFailed { domain: String, error: String },

    /// The dispatcher finished
    NotificationDispatched { outcome: NotificationOutcome },

    /// Scan ended in Completed
    ScanCompleted {
        keywords_scanned: u32,
        available_found: u32,
    },

    /// Scan ended in Failed
    ScanFailed { error: String },
}

/// Terminal state of one scan pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Completed,
    Failed,
}

/// Count of transitions observed during one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionTally {
    pub new_available: usize,
    pub new_taken: usize,
    pub regained: usize,
    pub lost: usize,
    pub no_change: usize,
    /// Oracle answered Unknown
    pub unknown: usize,
    /// Persisting the observation failed
    pub failed: usize,
}

impl TransitionTally {
    fn record(&mut self, transition: TransitionKind) {
        match transition {
            TransitionKind::NewAvailable => self.new_available += 1,
            TransitionKind::NewTaken => self.new_taken += 1,
            TransitionKind::Regained => self.regained += 1,
            TransitionKind::Lost => self.lost += 1,
            TransitionKind::NoChange => self.no_change += 1,
        }
    }
}

/// Outcome of [`ScanOrchestrator::run_scan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub state: ScanState,
    /// The persisted scan record
    pub record: ScanRecord,
    pub keywords_scanned: u32,
    /// Observations that came back available (before reconciliation)
    pub available_found: u32,
    pub transitions: TransitionTally,
    /// `None` when dispatch was not reached
    pub notification: Option<NotificationOutcome>,
}

/// Runs scan passes
///
/// ## Threading
///
/// Shared behind an `Arc`. Overlapping calls to [`ScanOrchestrator::run_scan`]
/// are refused with [`Error::ScanInProgress`], so at most one pass runs at a
/// time regardless of how many tasks hold the orchestrator.
pub struct ScanOrchestrator {
    store: Arc<dyn Store>,
    oracle: Arc<dyn AvailabilityOracle>,
    reconciler: Reconciler,
    dispatcher: NotificationDispatcher,
    extensions: Vec<String>,
    oracle_concurrency: usize,
    scan_lock: Mutex<()>,
    event_tx: mpsc::Sender<ScanEvent>,
}

impl ScanOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Parameters
    ///
    /// - `store`: Store implementation
    /// - `oracle`: Availability oracle implementation
    /// - `notifier`: Notifier implementation
    /// - `config`: Monitor configuration
    ///
    /// # Returns
    ///
    /// A tuple of (orchestrator, event_receiver) where event_receiver yields scan events
    pub fn new(
        store: Arc<dyn Store>,
        oracle: Arc<dyn AvailabilityOracle>,
        notifier: Arc<dyn Notifier>,
        config: &MonitorConfig,
    ) -> Result<(Self, mpsc::Receiver<ScanEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.scan.event_channel_capacity);

        let orchestrator = Self {
            reconciler: Reconciler::new(Arc::clone(&store)),
            dispatcher: NotificationDispatcher::new(
                Arc::clone(&store),
                notifier,
                config.mail.clone(),
            ),
            store,
            oracle,
            extensions: config.scan.extensions.clone(),
            oracle_concurrency: config.scan.oracle_concurrency,
            scan_lock: Mutex::new(()),
            event_tx: tx,
        };

        Ok((orchestrator, rx))
    }

    /// The store this orchestrator writes to
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The dispatcher used at the end of each pass
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Whether a pass is currently running
    pub fn is_running(&self) -> bool {
        self.scan_lock.try_lock().is_err()
    }

    /// Snapshot of keyword count, available count and notifier readiness
    pub async fn status(&self) -> Result<MonitorStatus> {
        Ok(MonitorStatus {
            keyword_count: self.store.active_keywords().await?.len(),
            available_domain_count: self.store.count_available().await?,
            notification_configured: self.dispatcher.is_configured().await?,
        })
    }

    /// Run one scan pass
    ///
    /// # Returns
    ///
    /// - `Ok(report)`: The pass ended (Completed or Failed) and was recorded
    /// - `Err(Error::ScanInProgress)`: Another pass is running
    /// - `Err(_)`: The scan record itself could not be written
    pub async fn run_scan(&self) -> Result<ScanReport> {
        let _guard = self.scan_lock.try_lock().map_err(|_| Error::ScanInProgress)?;

        let keywords = match self.store.active_keywords().await {
            Ok(keywords) => keywords,
            Err(e) => {
                let cause = Error::scan(format!("cannot load keywords: {}", e));
                return self.fail(0, 0, TransitionTally::default(), cause).await;
            }
        };

        let keywords_scanned = to_count(keywords.len());
        self.emit_event(ScanEvent::ScanStarted {
            keywords: keywords.len(),
        });

        if keywords.is_empty() {
            info!("No active keywords, nothing to scan");
            let record = self
                .record(ScanSummary {
                    scanned_at: Utc::now(),
                    keywords_scanned: 0,
                    domains_found: 0,
                    status: STATUS_NO_KEYWORDS.to_string(),
                })
                .await?;
            self.emit_event(ScanEvent::ScanCompleted {
                keywords_scanned: 0,
                available_found: 0,
            });
            return Ok(ScanReport {
                state: ScanState::Completed,
                record,
                keywords_scanned: 0,
                available_found: 0,
                transitions: TransitionTally::default(),
                notification: None,
            });
        }

        info!("Scanning {} keyword(s)", keywords.len());

        let mut tally = TransitionTally::default();
        let mut available_found = 0u32;
        for keyword in &keywords {
            available_found += self.scan_keyword(keyword, &mut tally).await;
        }

        let notification = match self.dispatcher.dispatch().await {
            Ok(outcome) => outcome,
            Err(e) => {
                return self
                    .fail(
                        keywords_scanned,
                        available_found,
                        tally,
                        Error::scan(format!("notification dispatch failed: {}", e)),
                    )
                    .await;
            }
        };
        self.emit_event(ScanEvent::NotificationDispatched {
            outcome: notification.clone(),
        });

        let record = self
            .record(ScanSummary {
                scanned_at: Utc::now(),
                keywords_scanned,
                domains_found: available_found,
                status: STATUS_SUCCESS.to_string(),
            })
            .await?;

        info!(
            "Scan complete: {} keyword(s), {} available domain(s) observed",
            keywords_scanned, available_found
        );
        self.emit_event(ScanEvent::ScanCompleted {
            keywords_scanned,
            available_found,
        });

        Ok(ScanReport {
            state: ScanState::Completed,
            record,
            keywords_scanned,
            available_found,
            transitions: tally,
            notification: Some(notification),
        })
    }

    /// Check and reconcile every variation of one keyword
    ///
    /// Returns the number of observations that came back available.
    async fn scan_keyword(&self, keyword: &Keyword, tally: &mut TransitionTally) -> u32 {
        let domains = generate_variations(&keyword.text, &self.extensions);
        debug!("Keyword '{}': checking {} domain(s)", keyword.text, domains.len());

        let answers = self.check_all(&domains).await;

        let mut available = 0;
        for (domain, answer) in domains.iter().zip(answers) {
            let Some(observed) = answer.as_observed() else {
                warn!("Availability of {} is unknown, skipping", domain);
                tally.unknown += 1;
                self.emit_event(ScanEvent::OracleUnknown {
                    domain: domain.clone(),
                });
                continue;
            };

            if observed {
                available += 1;
            }

            match self.reconciler.reconcile(domain, keyword.id, observed).await {
                Ok(reconciled) => {
                    tally.record(reconciled.transition);
                    self.emit_event(ScanEvent::DomainReconciled {
                        domain: domain.clone(),
                        transition: reconciled.transition,
                    });
                }
                Err(e) => {
                    error!("Failed to record {}: {}", domain, e);
                    tally.failed += 1;
                    self.emit_event(ScanEvent::ReconcileFailed {
                        domain: domain.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        available
    }

    /// Query the oracle for every domain, at most `oracle_concurrency` at once
    ///
    /// Answers come back in the order of `domains`. A task that panicked
    /// counts as Unknown.
    async fn check_all(&self, domains: &[String]) -> Vec<Availability> {
        let semaphore = Arc::new(Semaphore::new(self.oracle_concurrency));
        let mut tasks = JoinSet::new();

        for (index, domain) in domains.iter().enumerate() {
            let oracle = Arc::clone(&self.oracle);
            let semaphore = Arc::clone(&semaphore);
            let domain = domain.clone();
            tasks.spawn(async move {
                let answer = match semaphore.acquire_owned().await {
                    Ok(_permit) => oracle.check(&domain).await,
                    Err(_) => Availability::Unknown,
                };
                (index, answer)
            });
        }

        let mut answers = vec![Availability::Unknown; domains.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, answer)) => {
                    if let Some(slot) = answers.get_mut(index) {
                        *slot = answer;
                    }
                }
                Err(e) => warn!("Oracle task failed: {}", e),
            }
        }
        answers
    }

    /// Record a failed pass
    async fn fail(
        &self,
        keywords_scanned: u32,
        available_found: u32,
        transitions: TransitionTally,
        cause: Error,
    ) -> Result<ScanReport> {
        error!("Scan failed: {}", cause);
        self.emit_event(ScanEvent::ScanFailed {
            error: cause.to_string(),
        });

        let record = self
            .record(ScanSummary {
                scanned_at: Utc::now(),
                keywords_scanned,
                domains_found: available_found,
                status: format!("Failed: {}", cause),
            })
            .await?;

        Ok(ScanReport {
            state: ScanState::Failed,
            record,
            keywords_scanned,
            available_found,
            transitions,
            notification: None,
        })
    }

    async fn record(&self, summary: ScanSummary) -> Result<ScanRecord> {
        self.store.record_scan(&summary).await.map_err(|e| {
            error!("Failed to record scan: {}", e);
            e
        })
    }

    /// Emit a scan event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: ScanEvent) {
        // Send event, logging warning if channel is full (backpressure)
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Event channel full, dropping event. Consider increasing \
                     event_channel_capacity."
                );
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

fn to_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
