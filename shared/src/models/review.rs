//! Review Model
//!
//! A review is keyed by (order, product); the seller always comes from the order line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub buyer_id: String,
    pub seller_id: String,
    /// 1..=5
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Aggregated seller rating, recomputed explicitly after every review write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRating {
    pub seller_id: String,
    /// Rounded to one decimal
    #[serde(with = "rust_decimal::serde::float")]
    pub average_rating: Decimal,
    pub total_reviews: u64,
    pub updated_at: i64,
}

impl SellerRating {
    pub fn empty(seller_id: impl Into<String>, now: i64) -> Self {
        Self {
            seller_id: seller_id.into(),
            average_rating: Decimal::ZERO,
            total_reviews: 0,
            updated_at: now,
        }
    }
}

/// Average of `ratings` rounded to one decimal; zero for no ratings
pub fn average_rating(ratings: &[u8]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }
    let sum: u64 = ratings.iter().map(|r| u64::from(*r)).sum();
    (Decimal::from(sum) / Decimal::from(ratings.len() as u64)).round_dp(1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCreate {
    pub order_id: i64,
    pub product_id: i64,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}
