//! Status-transition reconciliation
//!
//! Compares a fresh availability observation with the stored record for the
//! same domain and computes the next stored state plus a [`TransitionKind`].
//!
//! ## Transition Table
//!
//! | stored            | observed  | transition     | next record                                 |
//! |-------------------|-----------|----------------|---------------------------------------------|
//! | none              | available | `NewAvailable` | insert available=true, notified=false       |
//! | none              | taken     | `NewTaken`     | insert available=false, notified=false      |
//! | available=false   | available | `Regained`     | available=true, notified=false, checked=now |
//! | available=true    | taken     | `Lost`         | available=false, notified kept, checked=now |
//! | unchanged         | same      | `NoChange`     | checked=now only                            |
//!
//! Resetting `notified` on `Regained` scopes alerts to availability episodes:
//! a domain that was alerted on, lost, and freed again alerts once more.
//!
//! [`plan`] is pure. Stores call it inside their per-domain transaction
//! (see [`Store::reconcile_domain`]); [`Reconciler`] is the entry point the
//! orchestrator uses.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{DomainId, DomainRecord, KeywordId, Observation, TransitionKind};
use crate::traits::Store;

/// A domain record that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDomain {
    pub keyword_id: KeywordId,
    pub domain: String,
    pub available: bool,
    pub checked_at: DateTime<Utc>,
}

impl NewDomain {
    /// Materialize the record once the store assigned an id
    pub fn into_record(self, id: DomainId) -> DomainRecord {
        DomainRecord {
            id,
            keyword_id: self.keyword_id,
            domain: self.domain,
            available: self.available,
            checked_at: self.checked_at,
            notified: false,
        }
    }
}

/// Write a store has to perform for one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainChange {
    /// First observation of the domain
    Insert(NewDomain),
    /// Replace the stored record with this one (same id)
    Update(DomainRecord),
}

/// Outcome of [`plan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub change: DomainChange,
    pub transition: TransitionKind,
}

/// Persisted outcome of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub record: DomainRecord,
    pub transition: TransitionKind,
}

/// Compute the next state of a domain record
///
/// # Parameters
///
/// - `existing`: The stored record for `observation.domain`, if any
/// - `observation`: A definite availability observation
pub fn plan(existing: Option<&DomainRecord>, observation: &Observation) -> Plan {
    let Some(existing) = existing else {
        let transition = if observation.available {
            TransitionKind::NewAvailable
        } else {
            TransitionKind::NewTaken
        };
        return Plan {
            change: DomainChange::Insert(NewDomain {
                keyword_id: observation.keyword_id,
                domain: observation.domain.clone(),
                available: observation.available,
                checked_at: observation.observed_at,
            }),
            transition,
        };
    };

    let mut next = existing.clone();
    next.checked_at = observation.observed_at;

    let transition = match (existing.available, observation.available) {
        (false, true) => {
            next.available = true;
            next.notified = false;
            TransitionKind::Regained
        }
        (true, false) => {
            next.available = false;
            TransitionKind::Lost
        }
        _ => TransitionKind::NoChange,
    };

    Plan {
        change: DomainChange::Update(next),
        transition,
    }
}

/// Reconciliation engine bound to a store
///
/// The only component that mutates domain records.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn Store>,
}

impl Reconciler {
    /// Create a reconciler writing to `store`
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Reconcile one definite observation
    ///
    /// Every call persists the computed record before returning. Any store
    /// failure is reported as [`Error::Persistence`]; the store guarantees no
    /// partial update was applied.
    pub async fn reconcile(
        &self,
        domain: &str,
        keyword_id: KeywordId,
        observed_available: bool,
    ) -> Result<Reconciled> {
        let observation = Observation {
            domain: domain.to_string(),
            keyword_id,
            available: observed_available,
            observed_at: Utc::now(),
        };

        let reconciled = self
            .store
            .reconcile_domain(&observation)
            .await
            .map_err(|e| match e {
                Error::Persistence(_) => e,
                other => Error::persistence(other.to_string()),
            })?;

        let transition = reconciled.transition;
        if transition.opens_episode() {
            info!("{} is available ({})", domain, transition);
        } else if transition == TransitionKind::Lost {
            info!("{} is no longer available", domain);
        } else {
            debug!("{}: {}", domain, transition);
        }

        Ok(reconciled)
    }
}
