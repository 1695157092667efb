//! Background scan worker
//!
//! One [`Monitor`] task owns every scan: it runs a pass at start-up, then on
//! every interval tick and on every accepted manual trigger. Callers hold a
//! [`MonitorHandle`], whose `start_scan` returns immediately with an
//! acknowledgement.
//!
//! ## Duplicate Triggers
//!
//! The handle and the worker share an in-flight flag. A trigger is accepted
//! only if it flips the flag from idle to busy; the worker clears it when the
//! pass ends. While a pass runs or one is queued, further triggers are
//! answered with [`TriggerAck::AlreadyRunning`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{IntervalStream, ReceiverStream};
use tracing::{debug, error, info, warn};

use super::{ScanOrchestrator, ScanState};
use crate::error::{Error, Result};
use crate::model::MonitorStatus;

/// Answer to [`MonitorHandle::start_scan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAck {
    /// A pass will start shortly
    Accepted,
    /// A pass is already running or queued; this trigger was dropped
    AlreadyRunning,
    /// The worker has stopped
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Scheduled,
    Manual,
}

/// Cloneable trigger/status API for a running [`Monitor`]
#[derive(Clone)]
pub struct MonitorHandle {
    orchestrator: Arc<ScanOrchestrator>,
    trigger_tx: mpsc::Sender<()>,
    in_flight: Arc<AtomicBool>,
}

impl MonitorHandle {
    /// Ask the worker for a scan pass
    ///
    /// Never waits for the scan; the outcome shows up in the scan history.
    pub fn start_scan(&self) -> TriggerAck {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Scan trigger ignored, a scan is already in flight");
            return TriggerAck::AlreadyRunning;
        }

        match self.trigger_tx.try_send(()) {
            Ok(()) => TriggerAck::Accepted,
            // A trigger is already queued and owns the flag
            Err(TrySendError::Full(())) => TriggerAck::AlreadyRunning,
            Err(TrySendError::Closed(())) => {
                self.in_flight.store(false, Ordering::Release);
                TriggerAck::Stopped
            }
        }
    }

    /// Whether a pass is running or queued
    pub fn is_scanning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Keyword count, available domain count and notifier readiness
    pub async fn status(&self) -> Result<MonitorStatus> {
        self.orchestrator.status().await
    }
}

/// Single worker that runs scheduled and triggered scans
///
/// ## Lifecycle
///
/// 1. Create with [`Monitor::new()`], keep the returned handle
/// 2. Start with [`Monitor::run()`] (OS signals) or
///    [`Monitor::run_with_shutdown()`] (programmatic)
/// 3. On shutdown the current pass finishes, then the store is flushed
pub struct Monitor {
    orchestrator: Arc<ScanOrchestrator>,
    interval: Duration,
    trigger_rx: mpsc::Receiver<()>,
    in_flight: Arc<AtomicBool>,
}

impl Monitor {
    /// Create a worker and its handle
    ///
    /// # Parameters
    ///
    /// - `orchestrator`: Shared orchestrator
    /// - `interval`: Time between scheduled passes
    pub fn new(orchestrator: Arc<ScanOrchestrator>, interval: Duration) -> (Self, MonitorHandle) {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let in_flight = Arc::new(AtomicBool::new(false));

        let handle = MonitorHandle {
            orchestrator: Arc::clone(&orchestrator),
            trigger_tx,
            in_flight: Arc::clone(&in_flight),
        };

        let monitor = Self {
            orchestrator,
            interval,
            trigger_rx,
            in_flight,
        };

        (monitor, handle)
    }

    /// Run until SIGINT (Ctrl-C)
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run until the given signal fires (or, with `None`, until Ctrl-C)
    ///
    /// Dropping the sender counts as a shutdown signal.
    pub async fn run_with_shutdown(self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let Monitor {
            orchestrator,
            interval,
            trigger_rx,
            in_flight,
        } = self;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let triggers = IntervalStream::new(ticker)
            .map(|_| Trigger::Scheduled)
            .merge(ReceiverStream::new(trigger_rx).map(|_| Trigger::Manual));
        tokio::pin!(triggers);

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        info!("Monitor started, scanning every {}s", interval.as_secs());

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                Some(trigger) = triggers.next() => {
                    // Scheduled ticks bypass the handle, claim the flag here
                    in_flight.store(true, Ordering::Release);
                    debug!("Starting {:?} scan", trigger);
                    run_pass(&orchestrator).await;
                    in_flight.store(false, Ordering::Release);
                }

                else => break,
            }
        }

        // Flush state before exiting
        orchestrator.store().flush().await?;
        info!("Store flushed, monitor stopped");

        Ok(())
    }
}

async fn run_pass(orchestrator: &ScanOrchestrator) {
    match orchestrator.run_scan().await {
        Ok(report) if report.state == ScanState::Failed => {
            warn!("Scan ended in failure: {}", report.record.status);
        }
        Ok(report) => {
            debug!(
                "Scan recorded as #{} ({} available)",
                report.record.id, report.available_found
            );
        }
        Err(Error::ScanInProgress) => {
            warn!("Scan skipped, another scan is in progress");
        }
        Err(e) => error!("Scan could not be recorded: {}", e),
    }
}
