//! Domain model for the domwatch system
//!
//! Entities owned by the [`Store`](crate::traits::Store) plus the value types
//! exchanged with the oracle and the notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a [`Keyword`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordId(pub i64);

impl fmt::Display for KeywordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a [`DomainRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(pub i64);

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monitored search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: KeywordId,
    /// Normalized text (lower-cased, trimmed)
    pub text: String,
    pub added_at: DateTime<Utc>,
    pub active: bool,
}

/// Stored availability state of one fully-qualified domain name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: DomainId,
    /// Keyword whose variation produced this domain first
    pub keyword_id: KeywordId,
    pub domain: String,
    pub available: bool,
    pub checked_at: DateTime<Utc>,
    /// Whether an alert was delivered for the current availability episode
    pub notified: bool,
}

/// A domain record joined with its keyword text (for listings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainListing {
    pub record: DomainRecord,
    pub keyword: String,
}

/// Immutable audit entry for one scan pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub scanned_at: DateTime<Utc>,
    pub keywords_scanned: u32,
    pub domains_found: u32,
    pub status: String,
}

/// Values for a scan record that is about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned_at: DateTime<Utc>,
    pub keywords_scanned: u32,
    pub domains_found: u32,
    pub status: String,
}

/// Answer of the availability oracle for one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Not registered
    Available,
    /// Registered
    Taken,
    /// The check failed; stored state must not change
    Unknown,
}

impl Availability {
    /// Definite answer as a boolean, `None` for [`Availability::Unknown`]
    pub fn as_observed(self) -> Option<bool> {
        match self {
            Availability::Available => Some(true),
            Availability::Taken => Some(false),
            Availability::Unknown => None,
        }
    }
}

/// A definite availability observation ready for reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub domain: String,
    pub keyword_id: KeywordId,
    pub available: bool,
    pub observed_at: DateTime<Utc>,
}

/// Classification of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// First observation, available
    NewAvailable,
    /// First observation, taken
    NewTaken,
    /// Taken → available; opens a new availability episode
    Regained,
    /// Available → taken
    Lost,
    /// Same availability as stored
    NoChange,
}

impl TransitionKind {
    /// Whether this transition leaves the record eligible for a fresh alert
    pub fn opens_episode(self) -> bool {
        matches!(self, TransitionKind::NewAvailable | TransitionKind::Regained)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransitionKind::NewAvailable => "new_available",
            TransitionKind::NewTaken => "new_taken",
            TransitionKind::Regained => "regained",
            TransitionKind::Lost => "lost",
            TransitionKind::NoChange => "no_change",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an alert batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertItem {
    pub domain: String,
    pub keyword: String,
}

/// A record eligible for alerting (available and not yet notified)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlert {
    pub domain_id: DomainId,
    pub item: AlertItem,
}

/// Result of handing a batch to the notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReport {
    /// The notifier confirmed delivery of the whole batch
    Delivered,
    /// Delivery failed; nothing from the batch may be marked notified
    Failed(String),
}

/// Snapshot answered by the trigger API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub keyword_count: usize,
    pub available_domain_count: usize,
    pub notification_configured: bool,
}
