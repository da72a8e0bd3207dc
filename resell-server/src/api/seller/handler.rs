//! Seller API Handlers

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::Serialize;
use shared::models::{Order, SellerRating};

use crate::api::{PageQuery, StatusPayload, json_body, parse_id, parse_status};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::{OrderPage, SellerStats};
use crate::reviews::ReviewPage;
use crate::utils::{ApiResponse, AppResult};

/// Reviews received plus the stored aggregate
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerReviews {
    #[serde(flatten)]
    pub page: ReviewPage,
    pub rating: SellerRating,
}

pub async fn list_orders(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<OrderPage>>> {
    let status = query.status_filter()?;
    let page = state
        .orders
        .seller_orders(&user.id, status, query.page_request())?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn stats(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<SellerStats>>> {
    let stats = state.orders.seller_stats(&user.id)?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn order_detail(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order_id = parse_id(&id, "order")?;
    let order = state.orders.seller_order_detail(&user.id, order_id)?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<StatusPayload>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order_id = parse_id(&id, "order")?;
    let next = parse_status(json_body(payload)?.status.trim())?;
    let order = state.orders.update_status(&user.id, order_id, next)?;
    Ok(Json(ApiResponse::success_with_message(
        "Order status updated",
        order.seller_view(&user.id),
    )))
}

pub async fn complete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order_id = parse_id(&id, "order")?;
    let order = state.orders.complete_order(&user.id, order_id)?;
    Ok(Json(ApiResponse::success_with_message(
        "Order marked as completed",
        order.seller_view(&user.id),
    )))
}

pub async fn reviews(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<SellerReviews>>> {
    let page = state.reviews.seller_reviews(&user.id, query.page_request())?;
    let rating = state.reviews.seller_rating(&user.id)?;
    Ok(Json(ApiResponse::success(SellerReviews { page, rating })))
}
