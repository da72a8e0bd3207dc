//! Review service
//!
//! A review belongs to one (order, product) line. The seller is read from
//! that line, never from the client. Every write recomputes the seller's
//! aggregate rating in the same transaction via [`ReviewService::recompute_seller_rating`].

use redb::WriteTransaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    PageRequest, Review, ReviewCreate, ReviewUpdate, SellerRating, average_rating,
};
use shared::{AppError, AppResult, ErrorCode};

use crate::auth::CurrentUser;
use crate::security_log;
use crate::storage::{MarketStorage, StorageError, StorageResult};
use crate::utils::validation::MAX_COMMENT_LEN;

/// One page of reviews plus the aggregate over all of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_rating: Decimal,
    pub total_reviews: u64,
    pub current_page: u32,
    pub total_pages: u32,
}

impl ReviewPage {
    fn from_all(all: Vec<Review>, page: PageRequest) -> Self {
        let ratings: Vec<u8> = all.iter().map(|r| r.rating).collect();
        let total = all.len() as u64;
        Self {
            average_rating: average_rating(&ratings),
            total_reviews: total,
            current_page: page.page,
            total_pages: page.total_pages(total),
            reviews: all
                .into_iter()
                .skip(page.offset())
                .take(page.limit as usize)
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewService {
    storage: MarketStorage,
}

impl ReviewService {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    /// Create a review for a delivered/completed order line
    ///
    /// Checks, in order: order exists (404), caller is the buyer (403), order
    /// is reviewable (400), product is on the order (400), no existing review
    /// for the pair (409).
    pub fn create_review(&self, buyer_id: &str, payload: ReviewCreate) -> AppResult<Review> {
        validate_rating(payload.rating)?;
        validate_comment(&payload.comment)?;

        let txn = self.storage.begin_write()?;
        let order = self
            .storage
            .get_order_txn(&txn, payload.order_id)?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

        if order.buyer_id != buyer_id {
            security_log!("WARN", "review_denied", user_id = buyer_id, order_id = order.id);
            return Err(AppError::with_message(ErrorCode::NotResourceOwner, "Access denied"));
        }
        if !order.status.is_reviewable() {
            return Err(AppError::new(ErrorCode::ReviewNotAllowed)
                .with_detail("status", order.status.as_str()));
        }
        let line = order
            .item_for_product(payload.product_id)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotInOrder))?;
        if self
            .storage
            .find_review_id_txn(&txn, order.id, payload.product_id)?
            .is_some()
        {
            return Err(AppError::new(ErrorCode::ReviewAlreadyExists));
        }

        let now = shared::util::now_millis();
        let mut review = Review {
            id: shared::util::snowflake_id(),
            order_id: order.id,
            product_id: payload.product_id,
            buyer_id: buyer_id.to_string(),
            seller_id: line.seller_id.clone(),
            rating: payload.rating,
            comment: payload.comment.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.storage.insert_review(&txn, &mut review)?;
        self.recompute_seller_rating(&txn, &review.seller_id)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(review_id = review.id, order_id = order.id, seller_id = %review.seller_id, "Review created");
        Ok(review)
    }

    /// Author only
    pub fn update_review(&self, user_id: &str, review_id: i64, update: ReviewUpdate) -> AppResult<Review> {
        if let Some(rating) = update.rating {
            validate_rating(rating)?;
        }
        if let Some(comment) = &update.comment {
            validate_comment(comment)?;
        }

        let txn = self.storage.begin_write()?;
        let mut review = self
            .storage
            .get_review_txn(&txn, review_id)?
            .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound))?;
        if review.buyer_id != user_id {
            security_log!("WARN", "review_update_denied", user_id = user_id, review_id = review_id);
            return Err(AppError::with_message(ErrorCode::NotResourceOwner, "Access denied"));
        }

        if let Some(rating) = update.rating {
            review.rating = rating;
        }
        if let Some(comment) = update.comment {
            review.comment = comment.trim().to_string();
        }
        review.updated_at = shared::util::now_millis();

        self.storage.put_review(&txn, &review)?;
        self.recompute_seller_rating(&txn, &review.seller_id)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(review)
    }

    /// Author or admin
    pub fn delete_review(&self, user: &CurrentUser, review_id: i64) -> AppResult<()> {
        let txn = self.storage.begin_write()?;
        let review = self
            .storage
            .get_review_txn(&txn, review_id)?
            .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound))?;
        if !user.can_manage(&review.buyer_id) {
            security_log!("WARN", "review_delete_denied", user_id = user.id.as_str(), review_id = review_id);
            return Err(AppError::with_message(ErrorCode::NotResourceOwner, "Access denied"));
        }

        self.storage.remove_review(&txn, &review)?;
        self.recompute_seller_rating(&txn, &review.seller_id)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(())
    }

    /// Recompute and store `{ average_rating, total_reviews }` for a seller
    pub fn recompute_seller_rating(
        &self,
        txn: &WriteTransaction,
        seller_id: &str,
    ) -> StorageResult<SellerRating> {
        let ratings = self.storage.seller_ratings_txn(txn, seller_id)?;
        let rating = SellerRating {
            seller_id: seller_id.to_string(),
            average_rating: average_rating(&ratings),
            total_reviews: ratings.len() as u64,
            updated_at: shared::util::now_millis(),
        };
        self.storage.put_seller_rating(txn, &rating)?;
        tracing::debug!(
            seller_id = %seller_id,
            average = %rating.average_rating,
            total = rating.total_reviews,
            "Seller rating recomputed"
        );
        Ok(rating)
    }

    // ========== Reads ==========

    pub fn product_reviews(&self, product_id: i64, page: PageRequest) -> AppResult<ReviewPage> {
        Ok(ReviewPage::from_all(self.storage.product_reviews(product_id)?, page))
    }

    pub fn seller_reviews(&self, seller_id: &str, page: PageRequest) -> AppResult<ReviewPage> {
        Ok(ReviewPage::from_all(self.storage.seller_reviews(seller_id)?, page))
    }

    pub fn my_reviews(&self, user_id: &str, page: PageRequest) -> AppResult<ReviewPage> {
        Ok(ReviewPage::from_all(self.storage.buyer_reviews(user_id)?, page))
    }

    /// Stored aggregate; an empty rating if the seller has no reviews yet
    pub fn seller_rating(&self, seller_id: &str) -> AppResult<SellerRating> {
        Ok(self
            .storage
            .get_seller_rating(seller_id)?
            .unwrap_or_else(|| SellerRating::empty(seller_id, shared::util::now_millis())))
    }
}

fn validate_rating(rating: u8) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::validation_fields(vec![shared::error::FieldError::new(
            "rating",
            "Rating must be between 1 and 5",
        )]));
    }
    Ok(())
}

fn validate_comment(comment: &str) -> AppResult<()> {
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::validation_fields(vec![shared::error::FieldError::new(
            "comment",
            format!("Comment cannot exceed {MAX_COMMENT_LEN} characters"),
        )]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{
        Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
    };

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order(id: i64, status: OrderStatus) -> Order {
        let item = |product_id: i64, seller: &str| OrderItem {
            product_id,
            name: format!("p{product_id}"),
            price: dec("10.00"),
            quantity: 1,
            image: None,
            seller_id: seller.into(),
        };
        Order {
            id,
            order_number: format!("ORD{id}"),
            buyer_id: "buyer".into(),
            items: vec![item(100, "seller"), item(200, "seller")],
            subtotal: dec("20.00"),
            platform_fee: Decimal::ONE,
            total: dec("21.00"),
            shipping_address: ShippingAddress {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                phone: None,
                address: "1 Analytical St".into(),
                city: "London".into(),
                country: "UK".into(),
            },
            payment_method: PaymentMethod::CreditCard,
            status,
            payment_status: PaymentStatus::Pending,
            status_history: vec![],
            completed_at: None,
            created_at: id,
            updated_at: id,
        }
    }

    fn setup() -> ReviewService {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &order(1, OrderStatus::Delivered)).unwrap();
        storage.put_order(&txn, &order(2, OrderStatus::Shipped)).unwrap();
        storage.put_order(&txn, &order(3, OrderStatus::Completed)).unwrap();
        txn.commit().unwrap();
        ReviewService::new(storage)
    }

    fn create(order_id: i64, product_id: i64, rating: u8) -> ReviewCreate {
        ReviewCreate {
            order_id,
            product_id,
            rating,
            comment: "fine".into(),
        }
    }

    #[test]
    fn test_create_takes_seller_from_order_line() {
        let service = setup();
        let review = service.create_review("buyer", create(1, 100, 5)).unwrap();
        assert_eq!(review.seller_id, "seller");

        let rating = service.seller_rating("seller").unwrap();
        assert_eq!(rating.total_reviews, 1);
        assert_eq!(rating.average_rating, dec("5"));
    }

    #[test]
    fn test_create_checks_in_order() {
        let service = setup();

        let code = |r: AppResult<Review>| r.unwrap_err().code;
        assert_eq!(code(service.create_review("buyer", create(9, 100, 5))), ErrorCode::OrderNotFound);
        assert_eq!(code(service.create_review("x", create(1, 100, 5))), ErrorCode::NotResourceOwner);
        assert_eq!(code(service.create_review("buyer", create(2, 100, 5))), ErrorCode::ReviewNotAllowed);
        assert_eq!(code(service.create_review("buyer", create(1, 300, 5))), ErrorCode::ProductNotInOrder);
        assert_eq!(code(service.create_review("buyer", create(1, 100, 6))), ErrorCode::ValidationFailed);

        service.create_review("buyer", create(1, 100, 5)).unwrap();
        let dup = service.create_review("buyer", create(1, 100, 4)).unwrap_err();
        assert_eq!(dup.code, ErrorCode::ReviewAlreadyExists);
        assert_eq!(dup.http_status(), http::StatusCode::CONFLICT);
    }

    #[test]
    fn test_rating_recomputed_on_every_write() {
        let service = setup();
        service.create_review("buyer", create(1, 100, 5)).unwrap();
        let second = service.create_review("buyer", create(1, 200, 4)).unwrap();
        service.create_review("buyer", create(3, 100, 4)).unwrap();
        // (5 + 4 + 4) / 3 = 4.33 -> 4.3
        assert_eq!(service.seller_rating("seller").unwrap().average_rating, dec("4.3"));

        service
            .update_review("buyer", second.id, ReviewUpdate { rating: Some(1), comment: None })
            .unwrap();
        // (5 + 1 + 4) / 3 = 3.33 -> 3.3
        assert_eq!(service.seller_rating("seller").unwrap().average_rating, dec("3.3"));

        let admin = CurrentUser {
            id: "root".into(),
            username: "root".into(),
            role: "admin".into(),
        };
        service.delete_review(&admin, second.id).unwrap();
        let rating = service.seller_rating("seller").unwrap();
        assert_eq!(rating.total_reviews, 2);
        assert_eq!(rating.average_rating, dec("4.5"));
    }

    #[test]
    fn test_update_and_delete_are_author_only() {
        let service = setup();
        let review = service.create_review("buyer", create(1, 100, 5)).unwrap();

        let err = service
            .update_review("seller", review.id, ReviewUpdate::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotResourceOwner);

        let stranger = CurrentUser {
            id: "stranger".into(),
            username: "stranger".into(),
            role: "user".into(),
        };
        assert_eq!(
            service.delete_review(&stranger, review.id).unwrap_err().code,
            ErrorCode::NotResourceOwner
        );
        assert_eq!(
            service.delete_review(&stranger, 42).unwrap_err().code,
            ErrorCode::ReviewNotFound
        );
    }

    #[test]
    fn test_listing_pages() {
        let service = setup();
        service.create_review("buyer", create(1, 100, 5)).unwrap();
        service.create_review("buyer", create(3, 100, 2)).unwrap();
        service.create_review("buyer", create(1, 200, 4)).unwrap();

        let product = service.product_reviews(100, PageRequest::new(Some(1), Some(1))).unwrap();
        assert_eq!(product.total_reviews, 2);
        assert_eq!(product.total_pages, 2);
        assert_eq!(product.reviews.len(), 1);
        assert_eq!(product.average_rating, dec("3.5"));

        assert_eq!(service.seller_reviews("seller", PageRequest::default()).unwrap().total_reviews, 3);
        assert_eq!(service.my_reviews("buyer", PageRequest::default()).unwrap().reviews.len(), 3);
        assert_eq!(service.my_reviews("nobody", PageRequest::default()).unwrap().total_reviews, 0);
    }
}
