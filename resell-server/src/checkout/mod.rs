//! Checkout Orchestrator
//!
//! Turns a user's cart into an order. Everything happens inside the single
//! write transaction handed out by the [`IdempotencyStore`]:
//!
//! 1. replay a recorded response for the key, if any
//! 2. load the cart (`Cart is empty` if none / no lines)
//! 3. re-validate and reserve stock for every line (Inventory Ledger)
//! 4. subtotal from the cart's price snapshots
//! 5. platform fee from the [`FeePolicy`]; total = subtotal + fee
//! 6. persist the order, empty the cart
//! 7. record the response under the key
//!
//! Any failure drops the transaction: no stock, order, cart or record change
//! becomes visible.

use std::sync::Arc;

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress, StatusChange,
};
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::fees::FeePolicy;
use crate::idempotency::{IdempotencyStore, MAX_KEY_LEN, Outcome, RecordedResponse, scoped_key};
use crate::inventory::{InventoryError, InventoryLedger, StockLine};
use crate::storage::{MarketStorage, StorageError};

pub const ORDER_PLACED_MESSAGE: &str = "Order placed successfully";

/// Validated checkout input
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Minimal order view returned by checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub platform_fee: Decimal,
    pub status: OrderStatus,
    pub created_at: i64,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            total: order.total,
            platform_fee: order.platform_fee,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

/// `201` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub order: OrderSummary,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Idempotency-Key must be 1-{MAX_KEY_LEN} characters")]
    InvalidIdempotencyKey,

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => AppError::new(ErrorCode::CartEmpty),
            CheckoutError::InvalidIdempotencyKey => {
                AppError::with_message(ErrorCode::IdempotencyKeyInvalid, err.to_string())
            }
            CheckoutError::Inventory(e) => e.into(),
            CheckoutError::Storage(e) => e.into(),
            CheckoutError::Encode(e) => AppError::internal(e.to_string()),
        }
    }
}

/// `ORD` + millisecond timestamp + 4 random digits
///
/// Best-effort unique; the order's primary key is the snowflake id.
pub fn generate_order_number(now_ms: i64) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("ORD{now_ms}{suffix}")
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    storage: MarketStorage,
    ledger: InventoryLedger,
    fees: Arc<dyn FeePolicy>,
    idempotency: IdempotencyStore,
}

impl CheckoutService {
    pub fn new(
        storage: MarketStorage,
        fees: Arc<dyn FeePolicy>,
        idempotency: IdempotencyStore,
    ) -> Self {
        Self {
            ledger: InventoryLedger::new(storage.clone()),
            storage,
            fees,
            idempotency,
        }
    }

    /// Place an order from `user_id`'s cart
    ///
    /// The returned response (status + exact body) is what gets sent to the
    /// client and, with a key, recorded for replay.
    pub fn checkout(
        &self,
        user_id: &str,
        request: &CheckoutRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Outcome<RecordedResponse>, CheckoutError> {
        let scoped = idempotency_key
            .map(|k| scoped_key(user_id, k).ok_or(CheckoutError::InvalidIdempotencyKey))
            .transpose()?;

        let outcome = self
            .idempotency
            .get_or_set(scoped.as_deref(), |txn| self.place_order(txn, user_id, request))?;

        if outcome.is_replayed() {
            tracing::info!(user_id = %user_id, "Checkout replayed from idempotency record");
        }
        Ok(outcome)
    }

    fn place_order(
        &self,
        txn: &redb::WriteTransaction,
        user_id: &str,
        request: &CheckoutRequest,
    ) -> Result<RecordedResponse, CheckoutError> {
        let mut cart = self
            .storage
            .get_cart_txn(txn, user_id)?
            .filter(|c| !c.is_empty())
            .ok_or(CheckoutError::EmptyCart)?;

        let lines: Vec<StockLine> = cart
            .items
            .iter()
            .map(|item| StockLine {
                product_id: item.product_id,
                name: item.name.clone(),
                quantity: item.quantity,
            })
            .collect();

        // check-all then decrement-all, inside this txn
        let products = self.ledger.reserve(txn, &lines)?;

        // Cart snapshot prices are authoritative
        let subtotal = cart.subtotal();
        let platform_fee = self.fees.compute(subtotal);
        let total = subtotal + platform_fee;

        let items: Vec<OrderItem> = cart
            .items
            .iter()
            .zip(&products)
            .map(|(item, product)| OrderItem {
                product_id: item.product_id,
                name: product.name.clone(),
                price: item.price,
                quantity: item.quantity,
                image: product.primary_image().map(str::to_string),
                seller_id: product.seller_id.clone(),
            })
            .collect();

        let now = shared::util::now_millis();
        let mut order = Order {
            id: shared::util::snowflake_id(),
            order_number: generate_order_number(now),
            buyer_id: user_id.to_string(),
            items,
            subtotal,
            platform_fee,
            total,
            shipping_address: request.shipping_address.clone(),
            payment_method: request.payment_method,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                at: now,
                by: user_id.to_string(),
            }],
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.insert_order(txn, &mut order)?;

        cart.items.clear();
        cart.updated_at = now;
        self.storage.put_cart(txn, &cart)?;

        let body = serde_json::to_string(&CheckoutResponse {
            message: ORDER_PLACED_MESSAGE.to_string(),
            order: OrderSummary::from(&order),
        })?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            buyer_id = %user_id,
            subtotal = %subtotal,
            platform_fee = %platform_fee,
            total = %total,
            fee_policy = self.fees.name(),
            "Order placed"
        );

        Ok(RecordedResponse { status: 201, body })
    }
}
