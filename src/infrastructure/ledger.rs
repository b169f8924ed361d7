//! Audit Ledger persistence (component C2, spec.md §4.2).
//!
//! Backed by SQLite through `sqlx`, mirroring the teacher's
//! `Database` wrapper: a pool, a `CREATE TABLE IF NOT EXISTS` schema
//! applied at startup, and a thin async API over it. Every row stores
//! one hash-chained entry; `seq` is the total order the rest of the
//! system replays from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::errors::LedgerError;
use crate::domain::ledger::{compute_entry_hash, LedgerEntry, LedgerRecord, GENESIS_HASH};
use crate::domain::ports::LedgerStore;

#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    /// Append is serialised by a single writer lock (spec.md §5: "the
    /// ledger serialised by a global append lock but otherwise
    /// lock-free for reads").
    append_lock: Arc<Mutex<()>>,
    next_seq: Arc<AtomicU64>,
}

impl SqliteLedgerStore {
    pub async fn connect(db_url: &str) -> Result<Self> {
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .context("failed to create ledger database directory")?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("failed to connect to ledger database")?;

        info!(db_url, "connected to audit ledger store");

        let store = Self {
            pool,
            append_lock: Arc::new(Mutex::new(())),
            next_seq: Arc::new(AtomicU64::new(1)),
        };
        store.init_schema().await?;
        store.resume_seq_counter().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                seq INTEGER PRIMARY KEY,
                record_json TEXT NOT NULL,
                recorded_at_nanos INTEGER NOT NULL,
                prev_hash TEXT NOT NULL,
                hash TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create ledger_entries table")?;
        Ok(())
    }

    async fn resume_seq_counter(&self) -> Result<()> {
        let row = sqlx::query("SELECT COALESCE(MAX(seq), 0) as max_seq FROM ledger_entries")
            .fetch_one(&self.pool)
            .await
            .context("failed to read max ledger seq")?;
        let max_seq: i64 = row.try_get("max_seq")?;
        self.next_seq.store(max_seq as u64 + 1, Ordering::SeqCst);
        Ok(())
    }

    async fn last_hash(&self) -> Result<[u8; 32], LedgerError> {
        let row = sqlx::query("SELECT hash FROM ledger_entries ORDER BY seq DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LedgerError::Io(e.to_string()))?;
        match row {
            Some(row) => {
                let hex_str: String = row.try_get("hash").map_err(|_| LedgerError::UnreadableEntry(0))?;
                let bytes = hex::decode(hex_str).map_err(|_| LedgerError::UnreadableEntry(0))?;
                bytes.try_into().map_err(|_| LedgerError::UnreadableEntry(0))
            }
            None => Ok(GENESIS_HASH),
        }
    }
}

#[async_trait::async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn append(&self, record: LedgerRecord) -> Result<u64, LedgerError> {
        let _guard = self.append_lock.lock().await;
        let prev_hash = self.last_hash().await?;
        let seq = self.next_seq.load(Ordering::SeqCst);
        let recorded_at = chrono::Utc::now();
        let hash = compute_entry_hash(prev_hash, seq, recorded_at, &record);
        let record_json = serde_json::to_string(&record).map_err(|e| LedgerError::Io(e.to_string()))?;

        sqlx::query("INSERT INTO ledger_entries (seq, record_json, recorded_at_nanos, prev_hash, hash) VALUES (?, ?, ?, ?, ?)")
            .bind(seq as i64)
            .bind(record_json)
            .bind(recorded_at.timestamp_nanos_opt().unwrap_or_default())
            .bind(hex::encode(prev_hash))
            .bind(hex::encode(hash))
            .execute(&self.pool)
            .await
            .map_err(|_| LedgerError::DurabilityTimeout)?;

        self.next_seq.store(seq + 1, Ordering::SeqCst);
        Ok(seq)
    }

    async fn read_since(&self, seq: u64) -> Result<Vec<LedgerEntry>, LedgerError> {
        let rows = sqlx::query("SELECT seq, record_json, recorded_at_nanos, prev_hash, hash FROM ledger_entries WHERE seq >= ? ORDER BY seq ASC")
            .bind(seq as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LedgerError::Io(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let seq: i64 = row.try_get("seq").map_err(|_| LedgerError::UnreadableEntry(seq))?;
            let record_json: String = row.try_get("record_json").map_err(|_| LedgerError::UnreadableEntry(seq as u64))?;
            let record: LedgerRecord = serde_json::from_str(&record_json).map_err(|_| LedgerError::UnreadableEntry(seq as u64))?;
            let recorded_at_nanos: i64 = row.try_get("recorded_at_nanos").map_err(|_| LedgerError::UnreadableEntry(seq as u64))?;
            let recorded_at = chrono::DateTime::from_timestamp_nanos(recorded_at_nanos);
            let prev_hash_hex: String = row.try_get("prev_hash").map_err(|_| LedgerError::UnreadableEntry(seq as u64))?;
            let hash_hex: String = row.try_get("hash").map_err(|_| LedgerError::UnreadableEntry(seq as u64))?;
            let prev_hash: [u8; 32] = hex::decode(prev_hash_hex).map_err(|_| LedgerError::UnreadableEntry(seq as u64))?.try_into().map_err(|_| LedgerError::UnreadableEntry(seq as u64))?;
            let hash: [u8; 32] = hex::decode(hash_hex).map_err(|_| LedgerError::UnreadableEntry(seq as u64))?.try_into().map_err(|_| LedgerError::UnreadableEntry(seq as u64))?;

            entries.push(LedgerEntry {
                seq: seq as u64,
                record,
                recorded_at,
                prev_hash,
                hash,
            });
        }
        Ok(entries)
    }

    async fn snapshot_hash(&self) -> Result<[u8; 32], LedgerError> {
        self.last_hash().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn fresh_store() -> SqliteLedgerStore {
        SqliteLedgerStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn append_assigns_increasing_sequence_numbers() {
        let store = fresh_store().await;
        let seq1 = store
            .append(LedgerRecord::AccountOpened {
                account_id: crate::domain::account::AccountId::new(),
                opening_capital: dec!(100000),
            })
            .await
            .unwrap();
        let seq2 = store
            .append(LedgerRecord::AccountOpened {
                account_id: crate::domain::account::AccountId::new(),
                opening_capital: dec!(200000),
            })
            .await
            .unwrap();
        assert_eq!(seq2, seq1 + 1);
    }

    #[tokio::test]
    async fn read_since_returns_a_valid_hash_chain() {
        let store = fresh_store().await;
        for _ in 0..3 {
            store
                .append(LedgerRecord::AccountOpened {
                    account_id: crate::domain::account::AccountId::new(),
                    opening_capital: dec!(100000),
                })
                .await
                .unwrap();
        }
        let entries = store.read_since(1).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(crate::domain::ledger::verify_chain(&entries).is_ok());
    }
}
