//! Review API
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/reviews | POST | 评价已送达订单中的商品 | 是 |
//! | /api/reviews/{id} | PUT | 修改 (仅作者) | 是 |
//! | /api/reviews/{id} | DELETE | 删除 (作者或管理员) | 是 |
//! | /api/reviews/product/{id} | GET | 商品评价 | 否 |
//! | /api/reviews/seller/{id} | GET | 卖家评价与评分 | 否 |
//! | /api/reviews/my-reviews | GET | 我的评价 | 是 |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reviews", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/my-reviews", get(handler::my_reviews))
        .route("/product/{id}", get(handler::product_reviews))
        .route("/seller/{id}", get(handler::seller_reviews))
        .route("/{id}", put(handler::update).delete(handler::delete))
}
