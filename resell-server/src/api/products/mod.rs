//! Product API
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/products | POST | 发布商品 | 是 |
//! | /api/products/{id} | GET | 商品详情 (浏览数 +1) | 否 |
//! | /api/products/{id} | PUT | 更新 (仅所有者) | 是 |
//! | /api/products/{id} | DELETE | 删除 (所有者或管理员) | 是 |
//! | /api/products/{id}/like | POST | 收藏/取消收藏 | 是 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/products", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::update)
                .delete(handler::delete),
        )
        .route("/{id}/like", post(handler::toggle_like))
}
