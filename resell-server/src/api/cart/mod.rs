//! Cart API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/cart | GET | 获取购物车 (自动创建、清理失效商品) |
//! | /api/cart | POST | 加入商品 `{ productId, quantity? }` |
//! | /api/cart | DELETE | 清空购物车 |
//! | /api/cart/{item_id} | PUT | 修改数量 `{ quantity }` |
//! | /api/cart/{item_id} | DELETE | 移除商品 |

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/cart", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/",
            get(handler::get_cart)
                .post(handler::add_item)
                .delete(handler::clear),
        )
        .route(
            "/{item_id}",
            put(handler::update_item).delete(handler::remove_item),
        )
}
