//! Review tables, indexes and the per-seller rating aggregate

use super::{MarketStorage, StorageResult, claim_id};
use redb::{ReadableTable, TableDefinition, WriteTransaction};
use shared::models::{Review, SellerRating};

/// key = review_id, value = JSON-serialized Review
const REVIEWS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("reviews");

/// key = (order_id, product_id), value = review_id
const REVIEW_KEYS_TABLE: TableDefinition<(i64, i64), i64> = TableDefinition::new("review_keys");

/// key = (product_id, review_id)
const PRODUCT_REVIEWS_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("product_reviews");

/// key = (seller_id, review_id)
const SELLER_REVIEWS_TABLE: TableDefinition<(&str, i64), ()> =
    TableDefinition::new("seller_reviews");

/// key = (buyer_id, review_id)
const BUYER_REVIEWS_TABLE: TableDefinition<(&str, i64), ()> = TableDefinition::new("buyer_reviews");

/// key = seller_id, value = JSON-serialized SellerRating
const SELLER_RATINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("seller_ratings");

pub(super) fn create_tables(txn: &WriteTransaction) -> StorageResult<()> {
    let _ = txn.open_table(REVIEWS_TABLE)?;
    let _ = txn.open_table(REVIEW_KEYS_TABLE)?;
    let _ = txn.open_table(PRODUCT_REVIEWS_TABLE)?;
    let _ = txn.open_table(SELLER_REVIEWS_TABLE)?;
    let _ = txn.open_table(BUYER_REVIEWS_TABLE)?;
    let _ = txn.open_table(SELLER_RATINGS_TABLE)?;
    Ok(())
}

impl MarketStorage {
    // ========== Writes (within transaction) ==========

    /// Insert a new review together with all of its index entries
    ///
    /// A taken `review.id` is replaced by a fresh one before anything is written.
    pub fn insert_review(&self, txn: &WriteTransaction, review: &mut Review) -> StorageResult<()> {
        {
            let table = txn.open_table(REVIEWS_TABLE)?;
            review.id = claim_id("reviews", review.id, |id| Ok(table.get(id)?.is_some()))?;
        }
        self.put_review(txn, review)?;
        {
            let mut keys = txn.open_table(REVIEW_KEYS_TABLE)?;
            keys.insert((review.order_id, review.product_id), review.id)?;
        }
        {
            let mut by_product = txn.open_table(PRODUCT_REVIEWS_TABLE)?;
            by_product.insert((review.product_id, review.id), ())?;
        }
        {
            let mut by_seller = txn.open_table(SELLER_REVIEWS_TABLE)?;
            by_seller.insert((review.seller_id.as_str(), review.id), ())?;
        }
        {
            let mut by_buyer = txn.open_table(BUYER_REVIEWS_TABLE)?;
            by_buyer.insert((review.buyer_id.as_str(), review.id), ())?;
        }
        Ok(())
    }

    /// Replace the stored review body (rating/comment edits; keys unchanged)
    pub fn put_review(&self, txn: &WriteTransaction, review: &Review) -> StorageResult<()> {
        let mut table = txn.open_table(REVIEWS_TABLE)?;
        let value = serde_json::to_vec(review)?;
        table.insert(review.id, value.as_slice())?;
        Ok(())
    }

    /// Remove a review and its index entries
    pub fn remove_review(&self, txn: &WriteTransaction, review: &Review) -> StorageResult<()> {
        {
            let mut table = txn.open_table(REVIEWS_TABLE)?;
            table.remove(review.id)?;
        }
        {
            let mut keys = txn.open_table(REVIEW_KEYS_TABLE)?;
            keys.remove((review.order_id, review.product_id))?;
        }
        {
            let mut by_product = txn.open_table(PRODUCT_REVIEWS_TABLE)?;
            by_product.remove((review.product_id, review.id))?;
        }
        {
            let mut by_seller = txn.open_table(SELLER_REVIEWS_TABLE)?;
            by_seller.remove((review.seller_id.as_str(), review.id))?;
        }
        {
            let mut by_buyer = txn.open_table(BUYER_REVIEWS_TABLE)?;
            by_buyer.remove((review.buyer_id.as_str(), review.id))?;
        }
        Ok(())
    }

    /// Review id for an (order, product) pair, if one exists
    pub fn find_review_id_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
        product_id: i64,
    ) -> StorageResult<Option<i64>> {
        let keys = txn.open_table(REVIEW_KEYS_TABLE)?;
        Ok(keys.get((order_id, product_id))?.map(|g| g.value()))
    }

    pub fn get_review_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Review>> {
        let table = txn.open_table(REVIEWS_TABLE)?;
        Ok(table
            .get(id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// Ratings of every review a seller has received (within transaction)
    pub fn seller_ratings_txn(&self, txn: &WriteTransaction, seller_id: &str) -> StorageResult<Vec<u8>> {
        let index = txn.open_table(SELLER_REVIEWS_TABLE)?;
        let reviews = txn.open_table(REVIEWS_TABLE)?;

        let mut ratings = Vec::new();
        for result in index.range((seller_id, i64::MIN)..=(seller_id, i64::MAX))? {
            let (key, _) = result?;
            if let Some(guard) = reviews.get(key.value().1)? {
                let review: Review = serde_json::from_slice(guard.value())?;
                ratings.push(review.rating);
            }
        }
        Ok(ratings)
    }

    pub fn put_seller_rating(&self, txn: &WriteTransaction, rating: &SellerRating) -> StorageResult<()> {
        let mut table = txn.open_table(SELLER_RATINGS_TABLE)?;
        let value = serde_json::to_vec(rating)?;
        table.insert(rating.seller_id.as_str(), value.as_slice())?;
        Ok(())
    }

    // ========== Reads ==========

    pub fn get_review(&self, id: i64) -> StorageResult<Option<Review>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REVIEWS_TABLE)?;
        Ok(table
            .get(id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    pub fn get_seller_rating(&self, seller_id: &str) -> StorageResult<Option<SellerRating>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SELLER_RATINGS_TABLE)?;
        Ok(table
            .get(seller_id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?)
    }

    /// All reviews of a product, newest first
    pub fn product_reviews(&self, product_id: i64) -> StorageResult<Vec<Review>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(PRODUCT_REVIEWS_TABLE)?;
        let table = read_txn.open_table(REVIEWS_TABLE)?;

        let mut reviews = Vec::new();
        for result in index.range((product_id, i64::MIN)..=(product_id, i64::MAX))?.rev() {
            let (key, _) = result?;
            if let Some(guard) = table.get(key.value().1)? {
                reviews.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(reviews)
    }

    /// All reviews a seller received, newest first
    pub fn seller_reviews(&self, seller_id: &str) -> StorageResult<Vec<Review>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(SELLER_REVIEWS_TABLE)?;
        let table = read_txn.open_table(REVIEWS_TABLE)?;

        let mut reviews = Vec::new();
        for result in index.range((seller_id, i64::MIN)..=(seller_id, i64::MAX))?.rev() {
            let (key, _) = result?;
            if let Some(guard) = table.get(key.value().1)? {
                reviews.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(reviews)
    }

    /// All reviews written by a buyer, newest first
    pub fn buyer_reviews(&self, buyer_id: &str) -> StorageResult<Vec<Review>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(BUYER_REVIEWS_TABLE)?;
        let table = read_txn.open_table(REVIEWS_TABLE)?;

        let mut reviews = Vec::new();
        for result in index.range((buyer_id, i64::MIN)..=(buyer_id, i64::MAX))?.rev() {
            let (key, _) = result?;
            if let Some(guard) = table.get(key.value().1)? {
                reviews.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: i64, order_id: i64, product_id: i64, rating: u8) -> Review {
        Review {
            id,
            order_id,
            product_id,
            buyer_id: "buyer".into(),
            seller_id: "seller".into(),
            rating,
            comment: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_insert_indexes_and_remove() {
        let storage = MarketStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.insert_review(&txn, &mut review(1, 10, 100, 5)).unwrap();
        storage.insert_review(&txn, &mut review(2, 10, 101, 3)).unwrap();
        assert_eq!(storage.find_review_id_txn(&txn, 10, 101).unwrap(), Some(2));
        assert_eq!(storage.seller_ratings_txn(&txn, "seller").unwrap(), vec![5, 3]);
        txn.commit().unwrap();

        assert_eq!(storage.product_reviews(100).unwrap().len(), 1);
        let ids: Vec<i64> = storage.seller_reviews("seller").unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(storage.buyer_reviews("buyer").unwrap().len(), 2);

        let txn = storage.begin_write().unwrap();
        storage.remove_review(&txn, &review(1, 10, 100, 5)).unwrap();
        assert_eq!(storage.find_review_id_txn(&txn, 10, 100).unwrap(), None);
        txn.commit().unwrap();

        assert!(storage.get_review(1).unwrap().is_none());
        assert!(storage.product_reviews(100).unwrap().is_empty());
        assert_eq!(storage.seller_reviews("seller").unwrap().len(), 1);
    }

    #[test]
    fn test_insert_with_taken_id_keeps_both_reviews() {
        let storage = MarketStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.insert_review(&txn, &mut review(1, 10, 100, 5)).unwrap();
        let mut clash = review(1, 11, 100, 2);
        storage.insert_review(&txn, &mut clash).unwrap();
        assert_ne!(clash.id, 1);
        assert_eq!(storage.find_review_id_txn(&txn, 11, 100).unwrap(), Some(clash.id));
        txn.commit().unwrap();

        assert_eq!(storage.get_review(1).unwrap().unwrap().rating, 5);
        assert_eq!(storage.product_reviews(100).unwrap().len(), 2);
    }

    #[test]
    fn test_seller_rating_roundtrip() {
        let storage = MarketStorage::open_in_memory().unwrap();
        assert!(storage.get_seller_rating("seller").unwrap().is_none());

        let txn = storage.begin_write().unwrap();
        let mut rating = SellerRating::empty("seller", 1);
        rating.total_reviews = 2;
        rating.average_rating = rust_decimal::Decimal::new(45, 1);
        storage.put_seller_rating(&txn, &rating).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_seller_rating("seller").unwrap().unwrap(), rating);
    }
}
