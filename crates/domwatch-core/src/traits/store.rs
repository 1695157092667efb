// # Store Trait
//
// Defines the interface for persistent state management.
//
// ## Purpose
//
// The store owns every entity of the system:
// - Keywords being monitored
// - One domain record per fully-qualified name ever observed
// - Scan history
// - Settings (mail credentials, UI preferences)
//
// ## Implementations
//
// - In-memory: `MemoryStore` (tests, embedding)
// - SQLite: `domwatch-store-sqlite` crate

use async_trait::async_trait;
use std::sync::Arc;

use crate::model::{
    DomainId, DomainListing, DomainRecord, Keyword, KeywordId, Observation, PendingAlert,
    ScanRecord, ScanSummary,
};
use crate::reconcile::Reconciled;

/// Trait for store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Implement locking/transactions for atomicity
///
/// ## Forbidden Capabilities
/// - ❌ Decide transitions itself (use [`crate::reconcile::plan`])
/// - ❌ Call the oracle or the notifier
///
/// ## Atomicity
///
/// [`Store::reconcile_domain`] must read the existing record, call
/// [`crate::reconcile::plan`] and write the result as one transaction:
/// no other writer may observe or produce an intermediate state for the
/// same domain. A failed write leaves the stored record untouched.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a keyword, or return the id of the existing one with the same text
    ///
    /// `text` must already be normalized. An existing inactive keyword is
    /// reactivated.
    async fn add_keyword(&self, text: &str) -> Result<KeywordId, crate::Error>;

    /// All active keywords, in insertion order
    async fn active_keywords(&self) -> Result<Vec<Keyword>, crate::Error>;

    /// Deactivate a keyword
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The keyword was active and is now inactive
    /// - `Ok(false)`: No such keyword, or already inactive
    async fn deactivate_keyword(&self, id: KeywordId) -> Result<bool, crate::Error>;

    /// Get the stored record for a domain
    async fn domain(&self, domain: &str) -> Result<Option<DomainRecord>, crate::Error>;

    /// Reconcile one observation against the stored record, atomically
    async fn reconcile_domain(&self, observation: &Observation)
    -> Result<Reconciled, crate::Error>;

    /// Available domains with their keyword, most recently checked first
    async fn available_domains(&self, limit: usize) -> Result<Vec<DomainListing>, crate::Error>;

    /// All domains with their keyword, ordered by keyword then domain
    async fn all_domains(&self, limit: usize) -> Result<Vec<DomainListing>, crate::Error>;

    /// Number of records currently available
    async fn count_available(&self) -> Result<usize, crate::Error>;

    /// Records with available=true and notified=false
    async fn pending_alerts(&self) -> Result<Vec<PendingAlert>, crate::Error>;

    /// Set notified=true on every listed record in one operation
    ///
    /// Either all ids are marked or, on error, none are.
    async fn mark_notified(&self, ids: &[DomainId]) -> Result<usize, crate::Error>;

    /// Append a scan record
    async fn record_scan(&self, summary: &ScanSummary) -> Result<ScanRecord, crate::Error>;

    /// Most recent scans first
    async fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>, crate::Error>;

    /// Get a setting value
    async fn get_setting(&self, key: &str) -> Result<Option<String>, crate::Error>;

    /// Insert or overwrite a setting
    async fn save_setting(&self, key: &str, value: &str) -> Result<(), crate::Error>;

    /// Delete all keywords, domain records and scan history
    ///
    /// Settings are kept.
    async fn clear_all(&self) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing stores from configuration
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Create a store instance from configuration
    async fn create(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<Arc<dyn Store>, crate::Error>;
}
