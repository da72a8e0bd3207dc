//! redb-based storage layer for the marketplace
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `products` | `product_id` | `Product` | Catalogue + stock |
//! | `carts` | `user_id` | `Cart` | One cart per user |
//! | `orders` | `order_id` | `Order` | Order aggregates (never deleted) |
//! | `buyer_orders` | `(buyer_id, order_id)` | `()` | Buyer history index |
//! | `seller_orders` | `(seller_id, order_id)` | `()` | Seller dashboard index |
//! | `reviews` | `review_id` | `Review` | Reviews |
//! | `review_keys` | `(order_id, product_id)` | `review_id` | One review per order line |
//! | `product_reviews` | `(product_id, review_id)` | `()` | Product review index |
//! | `seller_reviews` | `(seller_id, review_id)` | `()` | Seller review index |
//! | `buyer_reviews` | `(buyer_id, review_id)` | `()` | Author index |
//! | `seller_ratings` | `seller_id` | `SellerRating` | Aggregated rating |
//! | `idempotency` | `scoped_key` | `IdempotencyRecord` | Recorded checkout responses |
//! | `idempotency_expiry` | `(expires_at, scoped_key)` | `()` | Purge index |
//!
//! Ids are snowflakes, so iterating an index in reverse yields newest first.
//!
//! # Atomicity
//!
//! redb serialises write transactions. Everything a checkout touches (stock,
//! order, cart, idempotency record) is written through the `*_txn` methods
//! inside one [`WriteTransaction`], so either all of it commits or none of it.

mod carts;
mod idempotency;
mod orders;
mod products;
mod reviews;

pub use idempotency::IdempotencyRecord;

use redb::{Database, ReadTransaction, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No free id in {table} after {attempts} attempts (last {id})")]
    IdCollision {
        table: &'static str,
        id: i64,
        attempts: usize,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Snowflake draws per create before giving up
pub const ID_ATTEMPTS: usize = 8;

/// First id, starting at `id`, that `taken` reports free
///
/// Snowflake ids carry only 12 random bits per millisecond, so creates check
/// the primary table and redraw on a hit instead of overwriting.
pub(crate) fn claim_id(
    table: &'static str,
    mut id: i64,
    mut taken: impl FnMut(i64) -> StorageResult<bool>,
) -> StorageResult<i64> {
    for _ in 0..ID_ATTEMPTS {
        if !taken(id)? {
            return Ok(id);
        }
        tracing::warn!(table, id, "Id collision, drawing a new id");
        id = shared::util::snowflake_id();
    }
    Err(StorageError::IdCollision {
        table,
        id,
        attempts: ID_ATTEMPTS,
    })
}

impl From<StorageError> for shared::AppError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Storage operation failed");
        shared::AppError::database(err.to_string())
    }
}

/// Marketplace storage backed by redb
#[derive(Clone)]
pub struct MarketStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for MarketStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketStorage").finish_non_exhaustive()
    }
}

impl MarketStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the data is on disk.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, tooling)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            products::create_tables(&write_txn)?;
            carts::create_tables(&write_txn)?;
            orders::create_tables(&write_txn)?;
            reviews::create_tables(&write_txn)?;
            idempotency::create_tables(&write_txn)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        use redb::ReadableDatabase;
        Ok(self.db.begin_read()?)
    }

    /// Cheap liveness probe used by the health endpoint
    pub fn ping(&self) -> StorageResult<()> {
        let txn = self.begin_read()?;
        drop(txn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resell.redb");

        let storage = MarketStorage::open(&path).unwrap();
        storage.ping().unwrap();
        drop(storage);

        // reopening keeps the existing tables
        let storage = MarketStorage::open(&path).unwrap();
        storage.ping().unwrap();
    }

    #[test]
    fn test_claim_id_redraws_taken_ids() {
        let taken = [42_i64];
        let id = claim_id("orders", 42, |id| Ok(taken.contains(&id))).unwrap();
        assert_ne!(id, 42);

        assert_eq!(claim_id("orders", 7, |_| Ok(false)).unwrap(), 7);

        let err = claim_id("orders", 1, |_| Ok(true)).unwrap_err();
        assert!(matches!(err, StorageError::IdCollision { attempts: ID_ATTEMPTS, .. }));
    }

    #[test]
    fn test_storage_error_maps_to_database_code() {
        let err = StorageError::Serialization(serde_json::from_str::<u8>("x").unwrap_err());
        let app: shared::AppError = err.into();
        assert_eq!(app.code, shared::ErrorCode::DatabaseError);
    }
}
