//! Inventory Ledger
//!
//! The only place product stock is mutated. Every method runs inside the
//! caller's write transaction; redb serialises writers, so the check and the
//! decrement of one checkout can't interleave with another checkout's.

use std::collections::HashMap;

use redb::WriteTransaction;
use shared::models::{Product, ProductStatus};
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::storage::{MarketStorage, StorageError};

/// One requested reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: i64,
    /// Name to report if the product is gone
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Product {name} no longer exists")]
    ProductNotFound { product_id: i64, name: String },

    #[error("Product {name} is no longer available")]
    ProductUnavailable { product_id: i64, name: String },

    #[error("Only {available} available for {name}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        available: u32,
        requested: u32,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl InventoryError {
    /// Offending product, if any
    pub fn product_id(&self) -> Option<i64> {
        match self {
            Self::ProductNotFound { product_id, .. }
            | Self::ProductUnavailable { product_id, .. }
            | Self::InsufficientStock { product_id, .. } => Some(*product_id),
            Self::Storage(_) => None,
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        let message = err.to_string();
        match err {
            InventoryError::ProductNotFound { product_id, .. } => {
                AppError::with_message(ErrorCode::ProductRemoved, message)
                    .with_detail("productId", product_id)
            }
            InventoryError::ProductUnavailable { product_id, .. } => {
                AppError::with_message(ErrorCode::ProductUnavailable, message)
                    .with_detail("productId", product_id)
            }
            InventoryError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            } => AppError::with_message(ErrorCode::InsufficientStock, message)
                .with_detail("productId", product_id)
                .with_detail("available", available)
                .with_detail("requested", requested),
            InventoryError::Storage(e) => e.into(),
        }
    }
}

/// Stock reads/writes against the product table
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    storage: MarketStorage,
}

impl InventoryLedger {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    /// Validate every line, in order, without writing anything
    ///
    /// Quantities for the same product are accumulated, so two lines for one
    /// product can't together exceed its stock. Returns the current products,
    /// one per line.
    pub fn check(
        &self,
        txn: &WriteTransaction,
        lines: &[StockLine],
    ) -> Result<Vec<Product>, InventoryError> {
        let mut requested: HashMap<i64, u32> = HashMap::new();
        let mut products = Vec::with_capacity(lines.len());

        for line in lines {
            let product = self
                .storage
                .get_product_txn(txn, line.product_id)?
                .ok_or_else(|| InventoryError::ProductNotFound {
                    product_id: line.product_id,
                    name: line.name.clone(),
                })?;

            if product.status != ProductStatus::Available {
                return Err(InventoryError::ProductUnavailable {
                    product_id: product.id,
                    name: product.name,
                });
            }

            let total = requested.entry(product.id).or_insert(0);
            *total = total.saturating_add(line.quantity);
            if *total > product.quantity {
                return Err(InventoryError::InsufficientStock {
                    product_id: product.id,
                    name: product.name,
                    available: product.quantity,
                    requested: *total,
                });
            }

            products.push(product);
        }

        Ok(products)
    }

    /// Check all lines, then decrement all of them
    ///
    /// Nothing is written unless every line passes. The caller commits or
    /// drops `txn`. Returns the pre-decrement products, one per line.
    pub fn reserve(
        &self,
        txn: &WriteTransaction,
        lines: &[StockLine],
    ) -> Result<Vec<Product>, InventoryError> {
        let products = self.check(txn, lines)?;
        for line in lines {
            self.reserve_stock(txn, line.product_id, line.quantity)?;
        }
        Ok(products)
    }

    /// Conditionally decrement one product: only if `quantity <= stock`
    ///
    /// Stock reaching zero flips the product to `Sold`.
    pub fn reserve_stock(
        &self,
        txn: &WriteTransaction,
        product_id: i64,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        let mut product = self.storage.get_product_txn(txn, product_id)?.ok_or_else(|| {
            InventoryError::ProductNotFound {
                product_id,
                name: product_id.to_string(),
            }
        })?;

        if product.status != ProductStatus::Available {
            return Err(InventoryError::ProductUnavailable {
                product_id,
                name: product.name,
            });
        }
        if quantity > product.quantity {
            return Err(InventoryError::InsufficientStock {
                product_id,
                name: product.name,
                available: product.quantity,
                requested: quantity,
            });
        }

        product.quantity -= quantity;
        if product.quantity == 0 {
            product.status = ProductStatus::Sold;
        }
        product.updated_at = shared::util::now_millis();
        self.storage.put_product(txn, &product)?;

        tracing::debug!(
            product_id,
            reserved = quantity,
            remaining = product.quantity,
            "Stock reserved"
        );
        Ok(())
    }
}
