//! Cart service
//!
//! One cart per user, created on first access. Cart operations never touch
//! product stock; they only check it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Cart, CartItem, Product, ProductStatus};
use shared::{AppError, AppResult, ErrorCode};

use crate::storage::MarketStorage;
use crate::utils::validation::validate_quantity;

/// Live product info shown next to a cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: i64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: Option<String>,
    pub status: ProductStatus,
    pub quantity: u32,
    pub seller_id: String,
}

impl From<&Product> for CartProduct {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            price: p.price,
            image: p.primary_image().map(str::to_string),
            status: p.status,
            quantity: p.quantity,
            seller_id: p.seller_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: CartProduct,
}

/// Cart as returned to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    /// Σ price snapshot × quantity
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub item_count: u32,
}

#[derive(Debug, Clone)]
pub struct CartService {
    storage: MarketStorage,
}

impl CartService {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    /// Load (or lazily create) the cart, pruning lines whose product is gone
    /// or no longer Available
    pub fn get_cart(&self, user_id: &str) -> AppResult<CartView> {
        let txn = self.storage.begin_write()?;
        let (cart, products) = self.load_pruned(&txn, user_id)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(Self::view(&cart, &products))
    }

    /// Add `quantity` of a product; merges with an existing line
    pub fn add_item(&self, user_id: &str, product_id: i64, quantity: u32) -> AppResult<CartView> {
        validate_quantity(quantity)?;

        let txn = self.storage.begin_write()?;
        let product = self
            .storage
            .get_product_txn(&txn, product_id)?
            .ok_or_else(|| AppError::with_message(ErrorCode::ProductNotFound, "Product not found"))?;

        if !product.is_available() {
            return Err(AppError::with_message(
                ErrorCode::ProductUnavailable,
                "Product is not available",
            ));
        }
        if product.seller_id == user_id {
            return Err(AppError::new(ErrorCode::CannotBuyOwnProduct));
        }

        let (mut cart, _) = self.load_pruned(&txn, user_id)?;
        let now = shared::util::now_millis();

        let existing = cart.find_product_mut(product_id).map(|line| line.quantity).unwrap_or(0);
        let combined = existing.saturating_add(quantity);
        if combined > product.quantity {
            return Err(insufficient(&product));
        }

        match cart.find_product_mut(product_id) {
            Some(line) => line.quantity = combined,
            None => cart.items.push(CartItem {
                id: shared::util::snowflake_id(),
                product_id,
                name: product.name.clone(),
                quantity,
                price: product.price,
                added_at: now,
            }),
        }
        cart.updated_at = now;
        self.storage.put_cart(&txn, &cart)?;

        let (cart, products) = self.load_pruned(&txn, user_id)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::debug!(user_id = %user_id, product_id, quantity, "Cart item added");
        Ok(Self::view(&cart, &products))
    }

    /// Set a line's quantity and refresh its price snapshot from the live product
    pub fn update_item(&self, user_id: &str, item_id: i64, quantity: u32) -> AppResult<CartView> {
        validate_quantity(quantity)?;

        let txn = self.storage.begin_write()?;
        let (mut cart, _) = self.load_pruned(&txn, user_id)?;

        let product_id = cart
            .find_item(item_id)
            .map(|line| line.product_id)
            .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;

        let product = self
            .storage
            .get_product_txn(&txn, product_id)?
            .filter(Product::is_available)
            .ok_or_else(|| {
                AppError::with_message(ErrorCode::ProductUnavailable, "Product is not available")
            })?;
        if quantity > product.quantity {
            return Err(insufficient(&product));
        }

        let now = shared::util::now_millis();
        if let Some(line) = cart.find_item_mut(item_id) {
            line.quantity = quantity;
            line.price = product.price;
            line.name = product.name.clone();
        }
        cart.updated_at = now;
        self.storage.put_cart(&txn, &cart)?;

        let (cart, products) = self.load_pruned(&txn, user_id)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(Self::view(&cart, &products))
    }

    pub fn remove_item(&self, user_id: &str, item_id: i64) -> AppResult<CartView> {
        let txn = self.storage.begin_write()?;
        let (mut cart, _) = self.load_pruned(&txn, user_id)?;

        let before = cart.items.len();
        cart.items.retain(|line| line.id != item_id);
        if cart.items.len() == before {
            return Err(AppError::new(ErrorCode::CartItemNotFound));
        }
        cart.updated_at = shared::util::now_millis();
        self.storage.put_cart(&txn, &cart)?;

        let (cart, products) = self.load_pruned(&txn, user_id)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(Self::view(&cart, &products))
    }

    /// Empty the cart (the cart itself is kept)
    pub fn clear(&self, user_id: &str) -> AppResult<CartView> {
        let txn = self.storage.begin_write()?;
        let now = shared::util::now_millis();
        let mut cart = self
            .storage
            .get_cart_txn(&txn, user_id)?
            .unwrap_or_else(|| Cart::new(user_id, now));
        cart.items.clear();
        cart.updated_at = now;
        self.storage.put_cart(&txn, &cart)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(Self::view(&cart, &[]))
    }

    // ========== internals ==========

    /// Get-or-create, drop stale lines, persist if anything changed
    ///
    /// Returns the cart plus the live product for each remaining line.
    fn load_pruned(
        &self,
        txn: &redb::WriteTransaction,
        user_id: &str,
    ) -> AppResult<(Cart, Vec<Product>)> {
        let now = shared::util::now_millis();
        let (mut cart, mut dirty) = match self.storage.get_cart_txn(txn, user_id)? {
            Some(cart) => (cart, false),
            None => (Cart::new(user_id, now), true),
        };

        let mut kept = Vec::with_capacity(cart.items.len());
        let mut products = Vec::with_capacity(cart.items.len());
        for line in cart.items.drain(..) {
            match self.storage.get_product_txn(txn, line.product_id)? {
                Some(product) if product.is_available() => {
                    kept.push(line);
                    products.push(product);
                }
                _ => {
                    tracing::debug!(user_id = %user_id, product_id = line.product_id, "Pruned stale cart line");
                    dirty = true;
                }
            }
        }
        cart.items = kept;

        if dirty {
            cart.updated_at = now;
            self.storage.put_cart(txn, &cart)?;
        }
        Ok((cart, products))
    }

    fn view(cart: &Cart, products: &[Product]) -> CartView {
        CartView {
            items: cart
                .items
                .iter()
                .zip(products)
                .map(|(item, product)| CartLine {
                    item: item.clone(),
                    product: CartProduct::from(product),
                })
                .collect(),
            total: cart.subtotal(),
            item_count: cart.item_count(),
        }
    }
}

fn insufficient(product: &Product) -> AppError {
    AppError::with_message(
        ErrorCode::InsufficientStock,
        format!("Only {} available for {}", product.quantity, product.name),
    )
    .with_detail("productId", product.id)
    .with_detail("available", product.quantity)
}
