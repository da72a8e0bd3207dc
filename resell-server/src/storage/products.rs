//! Product table

use super::{MarketStorage, StorageResult, claim_id};
use redb::{ReadableTable, TableDefinition, WriteTransaction};
use shared::models::Product;

/// key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");

pub(super) fn create_tables(txn: &WriteTransaction) -> StorageResult<()> {
    let _ = txn.open_table(PRODUCTS_TABLE)?;
    Ok(())
}

impl MarketStorage {
    /// Get a product by id
    pub fn get_product(&self, id: i64) -> StorageResult<Option<Product>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        Ok(table
            .get(id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// Get a product by id (within transaction)
    pub fn get_product_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        Ok(table
            .get(id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// Insert a new product, drawing a fresh id if `product.id` is taken
    pub fn insert_product(&self, txn: &WriteTransaction, product: &mut Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        product.id = claim_id("products", product.id, |id| Ok(table.get(id)?.is_some()))?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id, value.as_slice())?;
        Ok(())
    }

    /// Insert or replace a product
    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id, value.as_slice())?;
        Ok(())
    }

    /// Remove a product, returns whether it existed
    pub fn remove_product(&self, txn: &WriteTransaction, id: i64) -> StorageResult<bool> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        Ok(table.remove(id)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{ProductCategory, ProductCondition, ProductStatus};

    fn product(id: i64) -> Product {
        Product {
            id,
            name: "Desk Lamp".into(),
            description: "Warm light".into(),
            price: Decimal::new(2000, 2),
            original_price: None,
            category: ProductCategory::Furniture,
            condition: ProductCondition::Good,
            images: vec![],
            seller_id: "seller-1".into(),
            status: ProductStatus::Available,
            quantity: 3,
            sku: "FUR-000000000000-0000".into(),
            location: None,
            tags: vec![],
            view_count: 0,
            likes: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_put_get_remove_product() {
        let storage = MarketStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_product(&txn, &product(1)).unwrap();
        txn.commit().unwrap();

        let loaded = storage.get_product(1).unwrap().unwrap();
        assert_eq!(loaded.quantity, 3);
        assert!(storage.get_product(2).unwrap().is_none());

        let txn = storage.begin_write().unwrap();
        assert!(storage.remove_product(&txn, 1).unwrap());
        assert!(!storage.remove_product(&txn, 1).unwrap());
        txn.commit().unwrap();

        assert!(storage.get_product(1).unwrap().is_none());
    }

    #[test]
    fn test_insert_keeps_existing_product() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut first = product(1);
        storage.insert_product(&txn, &mut first).unwrap();
        let mut second = product(1);
        second.name = "Armchair".into();
        storage.insert_product(&txn, &mut second).unwrap();
        txn.commit().unwrap();

        assert_ne!(second.id, 1);
        assert_eq!(storage.get_product(1).unwrap().unwrap().name, "Desk Lamp");
        assert_eq!(storage.get_product(second.id).unwrap().unwrap().name, "Armchair");
    }

    #[test]
    fn test_aborted_write_is_invisible() {
        let storage = MarketStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_product(&txn, &product(1)).unwrap();
        txn.abort().unwrap();

        assert!(storage.get_product(1).unwrap().is_none());
    }
}
