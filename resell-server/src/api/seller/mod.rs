//! Seller API
//!
//! 卖家视角只能看到订单中属于自己的商品行。
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/seller/orders | GET | 卖家订单 (`?status=&page=&limit=`) |
//! | /api/seller/orders/stats | GET | 按状态统计与收入 |
//! | /api/seller/orders/{id} | GET | 订单详情 |
//! | /api/seller/orders/{id}/status | PATCH | 状态流转 |
//! | /api/seller/orders/{id}/complete | PATCH | 标记完成 |
//! | /api/seller/reviews | GET | 收到的评价与评分 |

mod handler;

pub use handler::SellerReviews;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/seller", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/orders", get(handler::list_orders))
        .route("/orders/stats", get(handler::stats))
        .route("/orders/{id}", get(handler::order_detail))
        .route("/orders/{id}/status", patch(handler::update_status))
        .route("/orders/{id}/complete", patch(handler::complete))
        .route("/reviews", get(handler::reviews))
}
