// # Memory Store
//
// In-memory implementation of Store.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing, embedding the monitor in another process, or
// one-shot scans where history is not needed.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - The first scan after a restart treats every domain as new, so every
//   available domain alerts again
//
// ## Atomicity
//
// Every method takes the single write (or read) lock for its whole
// duration, so `reconcile_domain` and `mark_notified` are trivially atomic.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::StoreConfig;
use crate::model::{
    AlertItem, DomainId, DomainListing, DomainRecord, Keyword, KeywordId, Observation,
    PendingAlert, ScanRecord, ScanSummary,
};
use crate::Error;
use crate::reconcile::{self, DomainChange, Reconciled};
use crate::traits::{Store, StoreFactory};

#[derive(Debug, Default)]
struct MemoryState {
    keywords: Vec<Keyword>,
    domains: HashMap<String, DomainRecord>,
    scans: Vec<ScanRecord>,
    settings: HashMap<String, String>,
    next_keyword_id: i64,
    next_domain_id: i64,
    next_scan_id: i64,
}

impl MemoryState {
    fn keyword_text(&self, id: KeywordId) -> String {
        self.keywords
            .iter()
            .find(|k| k.id == id)
            .map(|k| k.text.clone())
            .unwrap_or_default()
    }

    fn listing(&self, record: &DomainRecord) -> DomainListing {
        DomainListing {
            record: record.clone(),
            keyword: self.keyword_text(record.keyword_id),
        }
    }
}

/// In-memory store implementation
///
/// All state lives in one struct behind a RwLock. Cloning the store shares
/// the same state.
///
/// # Example
///
/// ```rust,no_run
/// use domwatch_core::state::MemoryStore;
/// use domwatch_core::traits::Store;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///
///     let id = store.add_keyword("acme").await?;
///     let keywords = store.active_keywords().await?;
///     assert_eq!(keywords[0].id, id);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of domain records in the store
    pub async fn domain_count(&self) -> usize {
        self.inner.read().await.domains.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add_keyword(&self, text: &str) -> Result<KeywordId, Error> {
        let mut guard = self.inner.write().await;
        // Re-adding a deactivated keyword brings it back
        if let Some(existing) = guard.keywords.iter_mut().find(|k| k.text == text) {
            existing.active = true;
            return Ok(existing.id);
        }

        guard.next_keyword_id += 1;
        let id = KeywordId(guard.next_keyword_id);
        guard.keywords.push(Keyword {
            id,
            text: text.to_string(),
            added_at: Utc::now(),
            active: true,
        });
        Ok(id)
    }

    async fn active_keywords(&self) -> Result<Vec<Keyword>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keywords.iter().filter(|k| k.active).cloned().collect())
    }

    async fn deactivate_keyword(&self, id: KeywordId) -> Result<bool, Error> {
        let mut guard = self.inner.write().await;
        match guard.keywords.iter_mut().find(|k| k.id == id && k.active) {
            Some(keyword) => {
                keyword.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn domain(&self, domain: &str) -> Result<Option<DomainRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.domains.get(domain).cloned())
    }

    async fn reconcile_domain(&self, observation: &Observation) -> Result<Reconciled, Error> {
        let mut guard = self.inner.write().await;
        let plan = reconcile::plan(guard.domains.get(&observation.domain), observation);

        let record = match plan.change {
            DomainChange::Insert(new) => {
                guard.next_domain_id += 1;
                new.into_record(DomainId(guard.next_domain_id))
            }
            DomainChange::Update(record) => record,
        };
        guard.domains.insert(record.domain.clone(), record.clone());

        Ok(Reconciled {
            record,
            transition: plan.transition,
        })
    }

    async fn available_domains(&self, limit: usize) -> Result<Vec<DomainListing>, Error> {
        let guard = self.inner.read().await;
        let mut records: Vec<&DomainRecord> =
            guard.domains.values().filter(|r| r.available).collect();
        records.sort_by(|a, b| b.checked_at.cmp(&a.checked_at).then(a.id.cmp(&b.id)));
        Ok(records
            .into_iter()
            .take(limit)
            .map(|r| guard.listing(r))
            .collect())
    }

    async fn all_domains(&self, limit: usize) -> Result<Vec<DomainListing>, Error> {
        let guard = self.inner.read().await;
        let mut listings: Vec<DomainListing> =
            guard.domains.values().map(|r| guard.listing(r)).collect();
        listings.sort_by(|a, b| {
            a.keyword
                .cmp(&b.keyword)
                .then_with(|| a.record.domain.cmp(&b.record.domain))
        });
        listings.truncate(limit);
        Ok(listings)
    }

    async fn count_available(&self) -> Result<usize, Error> {
        let guard = self.inner.read().await;
        Ok(guard.domains.values().filter(|r| r.available).count())
    }

    async fn pending_alerts(&self) -> Result<Vec<PendingAlert>, Error> {
        let guard = self.inner.read().await;
        let mut records: Vec<&DomainRecord> = guard
            .domains
            .values()
            .filter(|r| r.available && !r.notified)
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records
            .into_iter()
            .map(|r| PendingAlert {
                domain_id: r.id,
                item: AlertItem {
                    domain: r.domain.clone(),
                    keyword: guard.keyword_text(r.keyword_id),
                },
            })
            .collect())
    }

    async fn mark_notified(&self, ids: &[DomainId]) -> Result<usize, Error> {
        let mut guard = self.inner.write().await;
        let mut marked = 0;
        for record in guard.domains.values_mut() {
            if ids.contains(&record.id) {
                record.notified = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn record_scan(&self, summary: &ScanSummary) -> Result<ScanRecord, Error> {
        let mut guard = self.inner.write().await;
        guard.next_scan_id += 1;
        let record = ScanRecord {
            id: guard.next_scan_id,
            scanned_at: summary.scanned_at,
            keywords_scanned: summary.keywords_scanned,
            domains_found: summary.domains_found,
            status: summary.status.clone(),
        };
        guard.scans.push(record.clone());
        Ok(record)
    }

    async fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.scans.iter().rev().take(limit).cloned().collect())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.settings.get(key).cloned())
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.keywords.clear();
        guard.domains.clear();
        guard.scans.clear();
        guard.next_keyword_id = 0;
        guard.next_domain_id = 0;
        guard.next_scan_id = 0;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        // No-op for memory store (everything is already "persisted")
        Ok(())
    }
}

/// Factory for [`StoreConfig::Memory`]
pub struct MemoryStoreFactory;

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn Store>, Error> {
        match config {
            StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
            other => Err(Error::config(format!(
                "Memory store factory cannot build a '{}' store",
                other.type_name()
            ))),
        }
    }
}
