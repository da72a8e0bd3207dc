//! Idempotency records with an expiry index
//!
//! The expiry index is keyed `(expires_at, scoped_key)` so a purge is one
//! range scan from the start of the table up to `now`.

use super::{MarketStorage, StorageResult};
use redb::{ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};

/// key = scoped key (`<user_id>:<client key>`), value = JSON-serialized IdempotencyRecord
const IDEMPOTENCY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("idempotency");

/// key = (expires_at, scoped key)
const IDEMPOTENCY_EXPIRY_TABLE: TableDefinition<(i64, &str), ()> =
    TableDefinition::new("idempotency_expiry");

/// A recorded response
///
/// `body` is kept as the exact serialized text so replays are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub status: u16,
    pub body: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl IdempotencyRecord {
    /// A record stops being replayable once `now` reaches `expires_at`
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

pub(super) fn create_tables(txn: &WriteTransaction) -> StorageResult<()> {
    let _ = txn.open_table(IDEMPOTENCY_TABLE)?;
    let _ = txn.open_table(IDEMPOTENCY_EXPIRY_TABLE)?;
    Ok(())
}

impl MarketStorage {
    /// Look up a record (fast path, outside any write transaction)
    pub fn get_idempotency(&self, key: &str) -> StorageResult<Option<IdempotencyRecord>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(IDEMPOTENCY_TABLE)?;
        Ok(table
            .get(key)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// Look up a record (within transaction)
    pub fn get_idempotency_txn(
        &self,
        txn: &WriteTransaction,
        key: &str,
    ) -> StorageResult<Option<IdempotencyRecord>> {
        let table = txn.open_table(IDEMPOTENCY_TABLE)?;
        Ok(table
            .get(key)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// Record a response, replacing any expired record under the same key
    pub fn put_idempotency(
        &self,
        txn: &WriteTransaction,
        key: &str,
        record: &IdempotencyRecord,
    ) -> StorageResult<()> {
        let previous = self.get_idempotency_txn(txn, key)?;

        let mut expiry = txn.open_table(IDEMPOTENCY_EXPIRY_TABLE)?;
        if let Some(previous) = previous {
            expiry.remove((previous.expires_at, key))?;
        }
        expiry.insert((record.expires_at, key), ())?;

        let mut table = txn.open_table(IDEMPOTENCY_TABLE)?;
        let value = serde_json::to_vec(record)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Delete every record whose `expires_at <= now`, returns the count removed
    pub fn purge_idempotency(&self, now: i64) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        let mut expired: Vec<(i64, String)> = Vec::new();
        {
            let expiry = txn.open_table(IDEMPOTENCY_EXPIRY_TABLE)?;
            for result in expiry.range((i64::MIN, "")..(now.saturating_add(1), ""))? {
                let (key, _) = result?;
                let (expires_at, scoped) = key.value();
                expired.push((expires_at, scoped.to_string()));
            }
        }
        {
            let mut expiry = txn.open_table(IDEMPOTENCY_EXPIRY_TABLE)?;
            let mut table = txn.open_table(IDEMPOTENCY_TABLE)?;
            for (expires_at, scoped) in &expired {
                expiry.remove((*expires_at, scoped.as_str()))?;
                table.remove(scoped.as_str())?;
            }
        }
        txn.commit()?;
        Ok(expired.len())
    }
}
