//! Order tables + buyer/seller indexes

use super::{MarketStorage, StorageResult, claim_id};
use redb::{ReadableTable, TableDefinition, WriteTransaction};
use shared::models::Order;

/// key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// key = (buyer_id, order_id)
const BUYER_ORDERS_TABLE: TableDefinition<(&str, i64), ()> = TableDefinition::new("buyer_orders");

/// key = (seller_id, order_id); one entry per distinct seller on the order
const SELLER_ORDERS_TABLE: TableDefinition<(&str, i64), ()> =
    TableDefinition::new("seller_orders");

pub(super) fn create_tables(txn: &WriteTransaction) -> StorageResult<()> {
    let _ = txn.open_table(ORDERS_TABLE)?;
    let _ = txn.open_table(BUYER_ORDERS_TABLE)?;
    let _ = txn.open_table(SELLER_ORDERS_TABLE)?;
    Ok(())
}

impl MarketStorage {
    /// Insert a new order and its indexes
    ///
    /// If `order.id` is already taken a fresh id is drawn and written back
    /// into `order`; an existing order is never replaced.
    pub fn insert_order(&self, txn: &WriteTransaction, order: &mut Order) -> StorageResult<()> {
        {
            let table = txn.open_table(ORDERS_TABLE)?;
            order.id = claim_id("orders", order.id, |id| Ok(table.get(id)?.is_some()))?;
        }
        self.put_order(txn, order)
    }

    /// Replace an existing order and (re)write its indexes
    ///
    /// Line items never change after creation, so re-inserting the index
    /// entries on a status update is a no-op.
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            let value = serde_json::to_vec(order)?;
            table.insert(order.id, value.as_slice())?;
        }
        {
            let mut buyers = txn.open_table(BUYER_ORDERS_TABLE)?;
            buyers.insert((order.buyer_id.as_str(), order.id), ())?;
        }
        {
            let mut sellers = txn.open_table(SELLER_ORDERS_TABLE)?;
            for seller_id in order.seller_ids() {
                sellers.insert((seller_id.as_str(), order.id), ())?;
            }
        }
        Ok(())
    }

    /// Get an order by id
    pub fn get_order(&self, id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table
            .get(id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// Get an order by id (within transaction)
    pub fn get_order_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        Ok(table
            .get(id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// One page of a buyer's orders, newest first, plus the buyer's total count
    pub fn buyer_orders(
        &self,
        buyer_id: &str,
        offset: usize,
        limit: usize,
    ) -> StorageResult<(Vec<Order>, u64)> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(BUYER_ORDERS_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;

        let mut ids = Vec::new();
        for result in index.range((buyer_id, i64::MIN)..=(buyer_id, i64::MAX))?.rev() {
            let (key, _) = result?;
            ids.push(key.value().1);
        }

        let total = ids.len() as u64;
        let mut orders = Vec::new();
        for id in ids.into_iter().skip(offset).take(limit) {
            if let Some(guard) = orders_table.get(id)? {
                orders.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok((orders, total))
    }

    /// All orders containing at least one of the seller's items, newest first
    pub fn seller_orders(&self, seller_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(SELLER_ORDERS_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in index.range((seller_id, i64::MIN)..=(seller_id, i64::MAX))?.rev() {
            let (key, _) = result?;
            if let Some(guard) = orders_table.get(key.value().1)? {
                orders.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(orders)
    }

    /// Total number of orders (all buyers)
    pub fn order_count(&self) -> StorageResult<u64> {
        use redb::ReadableTableMetadata;
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{
        OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
    };

    fn order(id: i64, buyer: &str, sellers: &[&str]) -> Order {
        let items = sellers
            .iter()
            .enumerate()
            .map(|(i, s)| OrderItem {
                product_id: i as i64 + 1,
                name: format!("item-{i}"),
                price: Decimal::new(1000, 2),
                quantity: 1,
                image: None,
                seller_id: s.to_string(),
            })
            .collect();
        Order {
            id,
            order_number: format!("ORD{id}"),
            buyer_id: buyer.into(),
            items,
            subtotal: Decimal::ZERO,
            platform_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            shipping_address: ShippingAddress {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                phone: None,
                address: "1 Analytical St".into(),
                city: "London".into(),
                country: "UK".into(),
            },
            payment_method: PaymentMethod::Paypal,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            status_history: vec![],
            completed_at: None,
            created_at: id,
            updated_at: id,
        }
    }

    #[test]
    fn test_buyer_orders_newest_first_with_paging() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        for id in 1..=5 {
            storage.put_order(&txn, &order(id, "buyer", &["s1"])).unwrap();
        }
        storage.put_order(&txn, &order(6, "other", &["s1"])).unwrap();
        txn.commit().unwrap();

        let (page, total) = storage.buyer_orders("buyer", 0, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|o| o.id).collect::<Vec<_>>(), vec![5, 4]);

        let (page, _) = storage.buyer_orders("buyer", 4, 2).unwrap();
        assert_eq!(page.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1]);

        assert_eq!(storage.order_count().unwrap(), 6);
    }

    #[test]
    fn test_seller_index_covers_every_seller_once() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &order(1, "b", &["s1", "s2", "s1"])).unwrap();
        storage.put_order(&txn, &order(2, "b", &["s2"])).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.seller_orders("s1").unwrap().len(), 1);
        let s2: Vec<i64> = storage.seller_orders("s2").unwrap().iter().map(|o| o.id).collect();
        assert_eq!(s2, vec![2, 1]);
        assert!(storage.seller_orders("s3").unwrap().is_empty());
    }

    #[test]
    fn test_insert_never_replaces_existing_order() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut alice = order(42, "alice", &["s1"]);
        storage.insert_order(&txn, &mut alice).unwrap();
        let mut bob = order(42, "bob", &["s1"]);
        storage.insert_order(&txn, &mut bob).unwrap();
        txn.commit().unwrap();

        assert_eq!(alice.id, 42);
        assert_ne!(bob.id, 42);
        assert_eq!(storage.order_count().unwrap(), 2);

        let (alice_orders, _) = storage.buyer_orders("alice", 0, 10).unwrap();
        assert_eq!(alice_orders.len(), 1);
        assert_eq!(alice_orders[0].buyer_id, "alice");
        assert_eq!(storage.get_order(bob.id).unwrap().unwrap().buyer_id, "bob");
    }

    #[test]
    fn test_status_update_rewrites_in_place() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &order(1, "b", &["s1"])).unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        let mut loaded = storage.get_order_txn(&txn, 1).unwrap().unwrap();
        loaded.status = OrderStatus::Processing;
        storage.put_order(&txn, &loaded).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_order(1).unwrap().unwrap().status, OrderStatus::Processing);
        assert_eq!(storage.buyer_orders("b", 0, 10).unwrap().1, 1);
    }
}
