//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 商品分类（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Electronics,
    Clothing,
    Furniture,
    Books,
    Sports,
    Other,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Clothing => "Clothing",
            Self::Furniture => "Furniture",
            Self::Books => "Books",
            Self::Sports => "Sports",
            Self::Other => "Other",
        }
    }
}

/// 商品成色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCondition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

/// 商品可售状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductStatus {
    #[default]
    Available,
    Sold,
    Reserved,
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Decimal>,
    pub category: ProductCategory,
    pub condition: ProductCondition,
    /// Image references (upload handled elsewhere)
    #[serde(default)]
    pub images: Vec<String>,
    /// Owning seller (user id)
    pub seller_id: String,
    #[serde(default)]
    pub status: ProductStatus,
    /// Units in stock; reaching 0 flips status to Sold
    pub quantity: u32,
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub view_count: u64,
    /// User ids that liked this product
    #[serde(default)]
    pub likes: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Purchasable / cart-addable
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Available
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    pub category: ProductCategory,
    pub condition: ProductCondition,
    #[serde(default)]
    pub images: Vec<String>,
    pub quantity: Option<u32>,
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    pub category: Option<ProductCategory>,
    pub condition: Option<ProductCondition>,
    pub images: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
    pub quantity: Option<u32>,
    pub location: Option<String>,
    pub tags: Option<Vec<String>>,
}
