//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use http::StatusCode;
use shared::models::{Product, ProductCreate, ProductUpdate};

use crate::api::{json_body, parse_id};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::products::LikeState;
use crate::utils::{ApiResponse, AppResult};

pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    payload: Result<Json<ProductCreate>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let product = state.products.create(&user.id, json_body(payload)?)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message("Product created", product)),
    ))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = state.products.get(parse_id(&id, "product")?)?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let id = parse_id(&id, "product")?;
    let product = state.products.update(&user.id, id, json_body(payload)?)?;
    Ok(Json(ApiResponse::success_with_message("Product updated", product)))
}

pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.products.delete(&user, parse_id(&id, "product")?)?;
    Ok(Json(ApiResponse {
        message: "Product deleted".to_string(),
        ..ApiResponse::ok()
    }))
}

pub async fn toggle_like(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<LikeState>>> {
    let like = state.products.toggle_like(&user.id, parse_id(&id, "product")?)?;
    Ok(Json(ApiResponse::success(like)))
}
