//! Checkout & buyer order API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/checkout | POST | 购物车下单 (可选 `Idempotency-Key`) |
//! | /api/checkout/orders | GET | 订单历史 |
//! | /api/checkout/orders/{id} | GET | 订单详情 (仅买家) |
//! | /api/checkout/orders/{id}/status | PATCH | 状态流转 (订单上的卖家) |

mod handler;

pub use handler::{CheckoutPayload, ShippingAddressInput};

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

/// 订单查询与状态流转，受请求超时约束
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checkout/orders", order_routes())
}

/// POST /api/checkout
///
/// 下单事务跑在阻塞线程上，超时只会丢掉响应而不会中止事务，因此不挂超时层。
pub fn checkout_router() -> Router<ServerState> {
    Router::new().route("/api/checkout", post(handler::checkout))
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::order_history))
        .route("/{id}", get(handler::order_detail))
        .route("/{id}/status", patch(handler::update_status))
}
