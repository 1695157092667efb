// # SQLite Store
//
// This crate provides the persistent Store implementation for domwatch,
// backed by a single SQLite database file.
//
// ## Schema
//
// - `keywords(id, keyword UNIQUE, added_at, active)`
// - `domains(id, keyword_id → keywords.id, domain UNIQUE, available, checked_at, notified)`
// - `scan_history(id, scanned_at, keywords_scanned, domains_found, status)`
// - `settings(key PRIMARY KEY, value)`
//
// Tables are created on open if missing.
//
// ## Atomicity
//
// `reconcile_domain` reads the stored record, plans the transition and
// writes the result inside one `BEGIN IMMEDIATE` transaction. The write lock
// is taken before the read, so concurrent reconciles (and any other writer)
// queue on the busy timeout instead of failing on a lock upgrade.
// `mark_notified` updates the whole batch in one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use domwatch_core::config::StoreConfig;
use domwatch_core::model::{
    AlertItem, DomainId, DomainListing, DomainRecord, Keyword, KeywordId, Observation,
    PendingAlert, ScanRecord, ScanSummary,
};
use domwatch_core::reconcile::{self, DomainChange, Reconciled};
use domwatch_core::traits::{Store, StoreFactory};
use domwatch_core::{Error, Registry, Result};

/// Maximum pooled connections
const MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits for the database lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Takes the write lock up front; a deferred read-then-write transaction
/// fails immediately under WAL when another connection is writing
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL UNIQUE,
    added_at TEXT NOT NULL,
    active BOOLEAN NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword_id INTEGER NOT NULL REFERENCES keywords(id),
    domain TEXT NOT NULL UNIQUE,
    available BOOLEAN NOT NULL,
    checked_at TEXT NOT NULL,
    notified BOOLEAN NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_domains_pending ON domains(available, notified);
CREATE TABLE IF NOT EXISTS scan_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scanned_at TEXT NOT NULL,
    keywords_scanned INTEGER NOT NULL,
    domains_found INTEGER NOT NULL,
    status TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const DOMAIN_COLUMNS: &str = "d.id, d.keyword_id, d.domain, d.available, d.checked_at, d.notified";

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::persistence(format!("{}: {}", context, e))
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[derive(FromRow)]
struct KeywordRow {
    id: i64,
    keyword: String,
    added_at: DateTime<Utc>,
    active: bool,
}

impl From<KeywordRow> for Keyword {
    fn from(row: KeywordRow) -> Self {
        Keyword {
            id: KeywordId(row.id),
            text: row.keyword,
            added_at: row.added_at,
            active: row.active,
        }
    }
}

#[derive(FromRow)]
struct DomainRow {
    id: i64,
    keyword_id: i64,
    domain: String,
    available: bool,
    checked_at: DateTime<Utc>,
    notified: bool,
}

impl From<DomainRow> for DomainRecord {
    fn from(row: DomainRow) -> Self {
        DomainRecord {
            id: DomainId(row.id),
            keyword_id: KeywordId(row.keyword_id),
            domain: row.domain,
            available: row.available,
            checked_at: row.checked_at,
            notified: row.notified,
        }
    }
}

#[derive(FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    domain: DomainRow,
    keyword: String,
}

impl From<ListingRow> for DomainListing {
    fn from(row: ListingRow) -> Self {
        DomainListing {
            record: row.domain.into(),
            keyword: row.keyword,
        }
    }
}

#[derive(FromRow)]
struct ScanRow {
    id: i64,
    scanned_at: DateTime<Utc>,
    keywords_scanned: i64,
    domains_found: i64,
    status: String,
}

impl From<ScanRow> for ScanRecord {
    fn from(row: ScanRow) -> Self {
        ScanRecord {
            id: row.id,
            scanned_at: row.scanned_at,
            keywords_scanned: u32::try_from(row.keywords_scanned).unwrap_or(0),
            domains_found: u32::try_from(row.domains_found).unwrap_or(0),
            status: row.status,
        }
    }
}

/// SQLite-backed store
///
/// Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`
    ///
    /// Missing parent directories are created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to open SQLite database"))?;

        let store = Self { pool };
        store.init_schema().await?;

        tracing::info!("SQLite store opened at {}", path.display());
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to create schema"))?;
        Ok(())
    }

    async fn listings(
        &self,
        filter: &str,
        order: &str,
        limit: usize,
    ) -> Result<Vec<DomainListing>> {
        let sql = format!(
            "SELECT {}, k.keyword FROM domains d JOIN keywords k ON k.id = d.keyword_id \
             {} ORDER BY {} LIMIT ?",
            DOMAIN_COLUMNS, filter, order
        );
        let rows: Vec<ListingRow> = sqlx::query_as(&sql)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list domains"))?;
        Ok(rows.into_iter().map(DomainListing::from).collect())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn add_keyword(&self, text: &str) -> Result<KeywordId> {
        // Re-adding a deactivated keyword brings it back
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO keywords (keyword, added_at, active) VALUES (?, ?, 1)
             ON CONFLICT(keyword) DO UPDATE SET active = 1
             RETURNING id",
        )
        .bind(text)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to add keyword"))?;
        Ok(KeywordId(id))
    }

    async fn active_keywords(&self) -> Result<Vec<Keyword>> {
        let rows: Vec<KeywordRow> = sqlx::query_as(
            "SELECT id, keyword, added_at, active FROM keywords WHERE active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load keywords"))?;
        Ok(rows.into_iter().map(Keyword::from).collect())
    }

    async fn deactivate_keyword(&self, id: KeywordId) -> Result<bool> {
        let result = sqlx::query("UPDATE keywords SET active = 0 WHERE id = ? AND active = 1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to deactivate keyword"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn domain(&self, domain: &str) -> Result<Option<DomainRecord>> {
        let sql = format!("SELECT {} FROM domains d WHERE d.domain = ?", DOMAIN_COLUMNS);
        let row: Option<DomainRow> = sqlx::query_as(&sql)
            .bind(domain)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load domain"))?;
        Ok(row.map(DomainRecord::from))
    }

    async fn reconcile_domain(&self, observation: &Observation) -> Result<Reconciled> {
        let mut tx = self
            .pool
            .begin_with(BEGIN_WRITE)
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let sql = format!("SELECT {} FROM domains d WHERE d.domain = ?", DOMAIN_COLUMNS);
        let existing: Option<DomainRow> = sqlx::query_as(&sql)
            .bind(&observation.domain)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to load domain"))?;
        let existing = existing.map(DomainRecord::from);

        let plan = reconcile::plan(existing.as_ref(), observation);

        let record = match plan.change {
            DomainChange::Insert(new) => {
                let id: i64 = sqlx::query_scalar(
                    "INSERT INTO domains (keyword_id, domain, available, checked_at, notified)
                     VALUES (?, ?, ?, ?, 0)
                     RETURNING id",
                )
                .bind(new.keyword_id.0)
                .bind(&new.domain)
                .bind(new.available)
                .bind(new.checked_at)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error("Failed to insert domain"))?;
                new.into_record(DomainId(id))
            }
            DomainChange::Update(record) => {
                sqlx::query(
                    "UPDATE domains SET available = ?, checked_at = ?, notified = ? WHERE id = ?",
                )
                .bind(record.available)
                .bind(record.checked_at)
                .bind(record.notified)
                .bind(record.id.0)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to update domain"))?;
                record
            }
        };

        tx.commit()
            .await
            .map_err(db_error("Failed to commit domain update"))?;

        Ok(Reconciled {
            record,
            transition: plan.transition,
        })
    }

    async fn available_domains(&self, limit: usize) -> Result<Vec<DomainListing>> {
        self.listings("WHERE d.available = 1", "d.checked_at DESC, d.id", limit)
            .await
    }

    async fn all_domains(&self, limit: usize) -> Result<Vec<DomainListing>> {
        self.listings("", "k.keyword, d.domain", limit).await
    }

    async fn count_available(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM domains WHERE available = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count domains"))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn pending_alerts(&self) -> Result<Vec<PendingAlert>> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT d.id, d.domain, k.keyword FROM domains d
             JOIN keywords k ON k.id = d.keyword_id
             WHERE d.available = 1 AND d.notified = 0
             ORDER BY d.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to select pending alerts"))?;

        Ok(rows
            .into_iter()
            .map(|(id, domain, keyword)| PendingAlert {
                domain_id: DomainId(id),
                item: AlertItem { domain, keyword },
            })
            .collect())
    }

    async fn mark_notified(&self, ids: &[DomainId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("UPDATE domains SET notified = 1 WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.0);
        }
        separated.push_unseparated(")");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to mark domains notified"))?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }

    async fn record_scan(&self, summary: &ScanSummary) -> Result<ScanRecord> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO scan_history (scanned_at, keywords_scanned, domains_found, status)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(summary.scanned_at)
        .bind(i64::from(summary.keywords_scanned))
        .bind(i64::from(summary.domains_found))
        .bind(&summary.status)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to record scan"))?;

        Ok(ScanRecord {
            id,
            scanned_at: summary.scanned_at,
            keywords_scanned: summary.keywords_scanned,
            domains_found: summary.domains_found,
            status: summary.status.clone(),
        })
    }

    async fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let rows: Vec<ScanRow> = sqlx::query_as(
            "SELECT id, scanned_at, keywords_scanned, domains_found, status
             FROM scan_history ORDER BY id DESC LIMIT ?",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load scan history"))?;
        Ok(rows.into_iter().map(ScanRecord::from).collect())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to read setting"))
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to save setting"))?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin_with(BEGIN_WRITE)
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        // Children before parents (foreign keys are enforced)
        for table in ["domains", "keywords", "scan_history"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to clear data"))?;
        }

        // Ids start over at 1
        sqlx::query(
            "DELETE FROM sqlite_sequence WHERE name IN ('domains', 'keywords', 'scan_history')",
        )
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to reset id sequences"))?;

        tx.commit().await.map_err(db_error("Failed to clear data"))?;
        tracing::info!("All keywords, domains and scan history deleted");
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        // Writes are committed as they happen; fold the WAL back into the main file
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to checkpoint database"))?;
        Ok(())
    }
}

/// Factory for [`StoreConfig::Sqlite`]
pub struct SqliteStoreFactory;

#[async_trait]
impl StoreFactory for SqliteStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn Store>> {
        match config {
            StoreConfig::Sqlite { path } => Ok(Arc::new(SqliteStore::open(path).await?)),
            other => Err(Error::config(format!(
                "SQLite store factory cannot build a '{}' store",
                other.type_name()
            ))),
        }
    }
}

/// Register the SQLite store with a registry
pub fn register(registry: &Registry) -> Result<()> {
    registry.register_store("sqlite", Box::new(SqliteStoreFactory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domwatch_core::model::TransitionKind;
    use tempfile::TempDir;

    async fn open_temp() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("data").join("domains.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn observe(domain: &str, keyword_id: KeywordId, available: bool) -> Observation {
        Observation {
            domain: domain.to_string(),
            keyword_id,
            available,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_reconcile_lifecycle() {
        let (_dir, store) = open_temp().await;
        let kw = store.add_keyword("foo").await.unwrap();

        let taken = store
            .reconcile_domain(&observe("foo.com", kw, false))
            .await
            .unwrap();
        assert_eq!(taken.transition, TransitionKind::NewTaken);

        let regained = store
            .reconcile_domain(&observe("foo.com", kw, true))
            .await
            .unwrap();
        assert_eq!(regained.transition, TransitionKind::Regained);
        assert_eq!(regained.record.id, taken.record.id);

        store.mark_notified(&[regained.record.id]).await.unwrap();

        let lost = store
            .reconcile_domain(&observe("foo.com", kw, false))
            .await
            .unwrap();
        assert_eq!(lost.transition, TransitionKind::Lost);
        assert!(lost.record.notified);

        let stored = store.domain("foo.com").await.unwrap().unwrap();
        assert_eq!(stored, lost.record);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domains.db");

        {
            let store = SqliteStore::open(&path).await.unwrap();
            let kw = store.add_keyword("foo").await.unwrap();
            store
                .reconcile_domain(&observe("foo.com", kw, true))
                .await
                .unwrap();
            store.save_setting("smtp_to", "me@example.com").await.unwrap();
            store.flush().await.unwrap();
        }

        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(store.active_keywords().await.unwrap().len(), 1);
        assert_eq!(store.pending_alerts().await.unwrap().len(), 1);
        assert_eq!(
            store.get_setting("smtp_to").await.unwrap().as_deref(),
            Some("me@example.com")
        );
    }

    #[tokio::test]
    async fn test_pending_alerts_and_batch_marking() {
        let (_dir, store) = open_temp().await;
        let kw = store.add_keyword("foo").await.unwrap();
        for domain in ["foo.com", "foo.net", "foo.org"] {
            store
                .reconcile_domain(&observe(domain, kw, true))
                .await
                .unwrap();
        }

        let pending = store.pending_alerts().await.unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].item.domain, "foo.com");
        assert_eq!(pending[0].item.keyword, "foo");

        let ids: Vec<DomainId> = pending.iter().map(|p| p.domain_id).collect();
        assert_eq!(store.mark_notified(&ids).await.unwrap(), 3);
        assert_eq!(store.mark_notified(&[]).await.unwrap(), 0);
        assert!(store.pending_alerts().await.unwrap().is_empty());
        assert_eq!(store.count_available().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_keywords_dedupe_and_reactivate() {
        let (_dir, store) = open_temp().await;
        let first = store.add_keyword("foo").await.unwrap();
        assert_eq!(store.add_keyword("foo").await.unwrap(), first);

        assert!(store.deactivate_keyword(first).await.unwrap());
        assert!(store.active_keywords().await.unwrap().is_empty());

        assert_eq!(store.add_keyword("foo").await.unwrap(), first);
        assert_eq!(store.active_keywords().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listings_and_history_order() {
        let (_dir, store) = open_temp().await;
        let zeta = store.add_keyword("zeta").await.unwrap();
        let alpha = store.add_keyword("alpha").await.unwrap();
        store.reconcile_domain(&observe("zeta.com", zeta, true)).await.unwrap();
        store.reconcile_domain(&observe("alpha.net", alpha, false)).await.unwrap();
        store.reconcile_domain(&observe("alpha.com", alpha, true)).await.unwrap();

        let all = store.all_domains(100).await.unwrap();
        let order: Vec<&str> = all.iter().map(|l| l.record.domain.as_str()).collect();
        assert_eq!(order, vec!["alpha.com", "alpha.net", "zeta.com"]);

        let available = store.available_domains(100).await.unwrap();
        assert_eq!(available.len(), 2);
        assert_eq!(available[0].record.domain, "alpha.com");
        assert_eq!(available[0].keyword, "alpha");

        for status in ["Success", "No keywords"] {
            store
                .record_scan(&ScanSummary {
                    scanned_at: Utc::now(),
                    keywords_scanned: 2,
                    domains_found: 2,
                    status: status.to_string(),
                })
                .await
                .unwrap();
        }
        let history = store.scan_history(1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, "No keywords");
    }

    #[tokio::test]
    async fn test_clear_all_keeps_settings() {
        let (_dir, store) = open_temp().await;
        store.add_keyword("bar").await.unwrap();
        let kw = store.add_keyword("foo").await.unwrap();
        store.reconcile_domain(&observe("foo.com", kw, true)).await.unwrap();
        store.save_setting("smtp_server", "smtp.example.com").await.unwrap();
        store.save_setting("smtp_server", "mail.example.com").await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.active_keywords().await.unwrap().is_empty());
        assert!(store.domain("foo.com").await.unwrap().is_none());
        assert_eq!(
            store.get_setting("smtp_server").await.unwrap().as_deref(),
            Some("mail.example.com")
        );

        // Id sequences restart after a clear
        let kw = store.add_keyword("baz").await.unwrap();
        assert_eq!(kw, KeywordId(1));
        let fresh = store.reconcile_domain(&observe("baz.com", kw, true)).await.unwrap();
        assert_eq!(fresh.record.id, DomainId(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_reconciles_of_one_domain() {
        let (_dir, store) = open_temp().await;
        let kw = store.add_keyword("foo").await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let store = store.clone();
            tasks.spawn(async move { store.reconcile_domain(&observe("foo.com", kw, true)).await });
        }

        let mut transitions = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            transitions.push(joined.unwrap().unwrap().transition);
        }

        let new_available = transitions
            .iter()
            .filter(|t| **t == TransitionKind::NewAvailable)
            .count();
        assert_eq!(new_available, 1);
        assert_eq!(transitions.len(), 16);
        assert_eq!(store.all_domains(100).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_reconciles_of_distinct_domains() {
        let (_dir, store) = open_temp().await;
        let kw = store.add_keyword("foo").await.unwrap();

        for round in 0..3 {
            let mut tasks = tokio::task::JoinSet::new();
            for i in 0..32 {
                let store = store.clone();
                let domain = format!("d{}.com", i);
                tasks.spawn(async move {
                    store.reconcile_domain(&observe(&domain, kw, true)).await
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let reconciled = joined.unwrap().unwrap();
                let expected = if round == 0 {
                    TransitionKind::NewAvailable
                } else {
                    TransitionKind::NoChange
                };
                assert_eq!(reconciled.transition, expected);
            }
        }
        assert_eq!(store.count_available().await.unwrap(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_reconciles_interleaved_with_setting_writes() {
        let (_dir, store) = open_temp().await;
        let kw = store.add_keyword("foo").await.unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    store.save_setting("ui_theme", &format!("theme-{}", i)).await?;
                }
                Ok::<(), Error>(())
            })
        };

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64 {
            let store = store.clone();
            let domain = format!("x{}.com", i);
            tasks.spawn(async move { store.reconcile_domain(&observe(&domain, kw, true)).await });
        }
        while let Some(joined) = tasks.join_next().await {
            let reconciled = joined.unwrap().unwrap();
            assert_eq!(reconciled.transition, TransitionKind::NewAvailable);
        }

        writer.await.unwrap().unwrap();
        assert_eq!(store.count_available().await.unwrap(), 64);
        assert_eq!(
            store.get_setting("ui_theme").await.unwrap().as_deref(),
            Some("theme-99")
        );
    }

    #[tokio::test]
    async fn test_factory_and_registration() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();
        register(&registry).unwrap();
        assert!(registry.has_store("sqlite"));

        let config = StoreConfig::Sqlite {
            path: dir.path().join("x.db").display().to_string(),
        };
        assert!(registry.create_store(&config).await.is_ok());
        assert!(SqliteStoreFactory.create(&StoreConfig::Memory).await.is_err());
    }
}
