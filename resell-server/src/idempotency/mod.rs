//! Idempotency Guard
//!
//! Deduplicates repeated submissions of a non-idempotent write by a
//! client-supplied key. Records live in redb, so they survive restarts.
//!
//! # Flow
//!
//! ```text
//! get_or_set(key, compute)
//!     │
//!     ├─ 1. fast path: committed, unexpired record?  → Replayed
//!     ├─ 2. begin write txn (waits for any in-flight writer)
//!     ├─ 3. double check inside txn                  → Replayed
//!     ├─ 4. compute(&txn)  (error → abort, nothing recorded)
//!     ├─ 5. record response under key
//!     └─ 6. commit                                   → Fresh
//! ```
//!
//! Step 3 closes the "retry races the original" window: redb admits one
//! writer at a time, so the second request sees the first one's record.

use std::time::Duration;

use redb::WriteTransaction;

use crate::storage::{IdempotencyRecord, MarketStorage, StorageError};

/// Longest accepted client key
pub const MAX_KEY_LEN: usize = 255;

/// Scope a client key to one user: `<user_id>:<key>`
///
/// Returns `None` for blank keys or keys longer than [`MAX_KEY_LEN`].
pub fn scoped_key(user_id: &str, key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() || key.chars().count() > MAX_KEY_LEN {
        return None;
    }
    Some(format!("{user_id}:{key}"))
}

/// A response as it was sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    pub status: u16,
    pub body: String,
}

impl From<IdempotencyRecord> for RecordedResponse {
    fn from(record: IdempotencyRecord) -> Self {
        Self {
            status: record.status,
            body: record.body,
        }
    }
}

/// Whether the result was produced now or replayed from a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Fresh(T),
    Replayed(T),
}

impl<T> Outcome<T> {
    pub fn is_replayed(&self) -> bool {
        matches!(self, Self::Replayed(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Fresh(v) | Self::Replayed(v) => v,
        }
    }
}

/// Durable key → response store with a retention window
#[derive(Debug, Clone)]
pub struct IdempotencyStore {
    storage: MarketStorage,
    ttl_ms: i64,
}

impl IdempotencyStore {
    pub fn new(storage: MarketStorage, ttl: Duration) -> Self {
        Self {
            storage,
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Replay the recorded response for `key`, or run `compute` and record it
    ///
    /// `compute` gets the write transaction and must do all of its writes
    /// through it; they commit together with the record. Errors are never
    /// recorded. Without a key this is a plain transactional execution.
    pub fn get_or_set<E, F>(&self, key: Option<&str>, compute: F) -> Result<Outcome<RecordedResponse>, E>
    where
        E: From<StorageError>,
        F: FnOnce(&WriteTransaction) -> Result<RecordedResponse, E>,
    {
        // 1. Fast path
        if let Some(key) = key
            && let Some(record) = self.storage.get_idempotency(key)?
            && !record.is_expired(shared::util::now_millis())
        {
            tracing::info!(key = %key, "Idempotent replay");
            return Ok(Outcome::Replayed(record.into()));
        }

        // 2. Serialise with other writers
        let txn = self.storage.begin_write()?;

        // 3. Double check: a concurrent request with the same key may have
        //    committed between the fast path and begin_write
        if let Some(key) = key
            && let Some(record) = self.storage.get_idempotency_txn(&txn, key)?
            && !record.is_expired(shared::util::now_millis())
        {
            txn.abort().map_err(StorageError::from)?;
            tracing::info!(key = %key, "Idempotent replay after concurrent commit");
            return Ok(Outcome::Replayed(record.into()));
        }

        // 4. Execute
        let response = match compute(&txn) {
            Ok(response) => response,
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::warn!(error = %abort_err, "Failed to abort transaction");
                }
                return Err(e);
            }
        };

        // 5. Record
        if let Some(key) = key {
            let now = shared::util::now_millis();
            let record = IdempotencyRecord {
                status: response.status,
                body: response.body.clone(),
                created_at: now,
                expires_at: now.saturating_add(self.ttl_ms),
            };
            self.storage.put_idempotency(&txn, key, &record)?;
        }

        // 6. Commit
        txn.commit().map_err(StorageError::from)?;
        Ok(Outcome::Fresh(response))
    }

    /// Remove records past their retention window
    pub fn purge_expired(&self) -> Result<usize, StorageError> {
        let removed = self.storage.purge_idempotency(shared::util::now_millis())?;
        if removed > 0 {
            tracing::debug!(removed, "Purged expired idempotency records");
        }
        Ok(removed)
    }
}
