//! Review API Handlers

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use http::StatusCode;
use shared::models::{Review, ReviewCreate, ReviewUpdate};

use crate::api::seller::SellerReviews;
use crate::api::{PageQuery, json_body, parse_id};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::reviews::ReviewPage;
use crate::utils::{ApiResponse, AppResult};

pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    payload: Result<Json<ReviewCreate>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let review = state.reviews.create_review(&user.id, json_body(payload)?)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message("Review created", review)),
    ))
}

pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<ReviewUpdate>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let id = parse_id(&id, "review")?;
    let review = state.reviews.update_review(&user.id, id, json_body(payload)?)?;
    Ok(Json(ApiResponse::success_with_message("Review updated", review)))
}

pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.reviews.delete_review(&user, parse_id(&id, "review")?)?;
    Ok(Json(ApiResponse {
        message: "Review deleted".to_string(),
        ..ApiResponse::ok()
    }))
}

pub async fn product_reviews(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<ReviewPage>>> {
    let page = state
        .reviews
        .product_reviews(parse_id(&id, "product")?, query.page_request())?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn seller_reviews(
    State(state): State<ServerState>,
    Path(seller_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<SellerReviews>>> {
    let page = state.reviews.seller_reviews(&seller_id, query.page_request())?;
    let rating = state.reviews.seller_rating(&seller_id)?;
    Ok(Json(ApiResponse::success(SellerReviews { page, rating })))
}

pub async fn my_reviews(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<ReviewPage>>> {
    let page = state.reviews.my_reviews(&user.id, query.page_request())?;
    Ok(Json(ApiResponse::success(page)))
}
