//! Read-through cache of resolved federation records.
//!
//! Records are stored under the domain that was looked up. A lookup may map
//! to several records; storing a record whose peer domain is already present
//! under the same lookup replaces it (last write wins).

use crate::FederationError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use fedlock_db::DbPool;
use fedlock_types::{FederationRecord, SrvTarget};
use rusqlite::params;
use std::time::Duration;

/// Storage contract for federation records.
#[async_trait]
pub trait FederationCache: Send + Sync {
    /// Records cached for `domain`. An empty list is a miss, never an error.
    async fn get(&self, domain: &str) -> Vec<FederationRecord>;

    async fn set(&self, domain: &str, record: FederationRecord) -> Result<(), FederationError>;

    async fn get_all(&self) -> Vec<FederationRecord>;

    /// Evicts expired records. Without a TTL this is a no-op.
    async fn prune(&self) -> Result<bool, FederationError>;
}

fn expiry_cutoff(ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl?).ok()?;
    Utc::now().checked_sub_signed(ttl)
}

/// In-process cache. Lookups for different domains never contend.
#[derive(Debug, Default)]
pub struct MemoryFederationCache {
    records: DashMap<String, Vec<FederationRecord>>,
    ttl: Option<Duration>,
}

impl MemoryFederationCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
        }
    }
}

#[async_trait]
impl FederationCache for MemoryFederationCache {
    async fn get(&self, domain: &str) -> Vec<FederationRecord> {
        self.records
            .get(domain)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    async fn set(&self, domain: &str, record: FederationRecord) -> Result<(), FederationError> {
        let mut entry = self.records.entry(domain.to_string()).or_default();
        entry.retain(|existing| existing.domain != record.domain);
        entry.push(record);
        Ok(())
    }

    async fn get_all(&self) -> Vec<FederationRecord> {
        self.records
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    async fn prune(&self) -> Result<bool, FederationError> {
        let Some(cutoff) = expiry_cutoff(self.ttl) else {
            return Ok(true);
        };
        self.records.retain(|_, records| {
            records.retain(|record| record.created >= cutoff);
            !records.is_empty()
        });
        Ok(true)
    }
}

/// Cache persisted in the `federation_records` SQLite table.
#[derive(Clone)]
pub struct SqliteFederationCache {
    pool: DbPool,
    ttl: Option<Duration>,
}

impl SqliteFederationCache {
    /// Expects a pool whose schema has been migrated.
    pub fn new(pool: DbPool, ttl: Option<Duration>) -> Self {
        Self { pool, ttl }
    }

    fn select(&self, domain: Option<String>) -> Result<Vec<FederationRecord>, FederationError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT domain, public_key, srv_json, created_at
             FROM federation_records
             WHERE ?1 IS NULL OR lookup_domain = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![domain], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (domain, public_key, srv_json, created_at) = row?;
            let srv: Vec<SrvTarget> = serde_json::from_str(&srv_json)
                .map_err(|e| FederationError::Cache(format!("corrupt srv_json: {e}")))?;
            let created = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| FederationError::Cache(format!("corrupt created_at: {e}")))?
                .with_timezone(&Utc);
            records.push(FederationRecord {
                domain,
                created,
                public_key,
                srv,
            });
        }
        Ok(records)
    }

    async fn load(&self, domain: Option<String>) -> Vec<FederationRecord> {
        let cache = self.clone();
        let result = tokio::task::spawn_blocking(move || cache.select(domain))
            .await
            .map_err(FederationError::from)
            .and_then(|inner| inner);
        match result {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("federation cache read failed, treating as miss: {}", e);
                Vec::new()
            }
        }
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl FederationCache for SqliteFederationCache {
    async fn get(&self, domain: &str) -> Vec<FederationRecord> {
        self.load(Some(domain.to_string())).await
    }

    async fn set(&self, domain: &str, record: FederationRecord) -> Result<(), FederationError> {
        let pool = self.pool.clone();
        let lookup_domain = domain.to_string();
        let srv_json = serde_json::to_string(&record.srv)
            .map_err(|e| FederationError::Cache(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM federation_records WHERE lookup_domain = ?1 AND domain = ?2",
                params![lookup_domain, record.domain],
            )?;
            tx.execute(
                "INSERT INTO federation_records (lookup_domain, domain, public_key, srv_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    lookup_domain,
                    record.domain,
                    record.public_key,
                    srv_json,
                    timestamp(record.created)
                ],
            )?;
            tx.commit()?;
            Ok::<_, FederationError>(())
        })
        .await?
    }

    async fn get_all(&self) -> Vec<FederationRecord> {
        self.load(None).await
    }

    async fn prune(&self) -> Result<bool, FederationError> {
        let Some(cutoff) = expiry_cutoff(self.ttl) else {
            return Ok(true);
        };
        let pool = self.pool.clone();
        let removed = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let removed = conn.execute(
                "DELETE FROM federation_records WHERE created_at < ?1",
                params![timestamp(cutoff)],
            )?;
            Ok::<_, FederationError>(removed)
        })
        .await??;
        if removed > 0 {
            tracing::info!(count = removed, "pruned expired federation records");
        }
        Ok(true)
    }
}
