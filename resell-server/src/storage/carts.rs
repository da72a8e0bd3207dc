//! Cart table

use super::{MarketStorage, StorageResult};
use redb::{ReadableTable, TableDefinition, WriteTransaction};
use shared::models::Cart;

/// key = user_id, value = JSON-serialized Cart
const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");

pub(super) fn create_tables(txn: &WriteTransaction) -> StorageResult<()> {
    let _ = txn.open_table(CARTS_TABLE)?;
    Ok(())
}

impl MarketStorage {
    /// Get a user's cart (None if never created)
    pub fn get_cart(&self, user_id: &str) -> StorageResult<Option<Cart>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;
        Ok(table
            .get(user_id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// Get a user's cart (within transaction)
    pub fn get_cart_txn(&self, txn: &WriteTransaction, user_id: &str) -> StorageResult<Option<Cart>> {
        let table = txn.open_table(CARTS_TABLE)?;
        Ok(table
            .get(user_id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// Insert or replace a cart
    pub fn put_cart(&self, txn: &WriteTransaction, cart: &Cart) -> StorageResult<()> {
        let mut table = txn.open_table(CARTS_TABLE)?;
        let value = serde_json::to_vec(cart)?;
        table.insert(cart.user_id.as_str(), value.as_slice())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_roundtrip_per_user() {
        let storage = MarketStorage::open_in_memory().unwrap();
        assert!(storage.get_cart("u1").unwrap().is_none());

        let txn = storage.begin_write().unwrap();
        storage.put_cart(&txn, &Cart::new("u1", 10)).unwrap();
        txn.commit().unwrap();

        let cart = storage.get_cart("u1").unwrap().unwrap();
        assert_eq!(cart.user_id, "u1");
        assert!(cart.is_empty());
        assert!(storage.get_cart("u2").unwrap().is_none());
    }
}
