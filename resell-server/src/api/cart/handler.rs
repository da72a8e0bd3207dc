//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use shared::error::FieldError;

use crate::api::{json_body, parse_id};
use crate::auth::CurrentUser;
use crate::carts::CartView;
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemPayload {
    pub product_id: i64,
    pub quantity: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemPayload {
    pub quantity: Option<u32>,
}

pub async fn get_cart(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let cart = state.carts.get_cart(&user.id)?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn add_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    payload: Result<Json<AddItemPayload>, JsonRejection>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let payload = json_body(payload)?;
    let cart = state.carts.add_item(
        &user.id,
        payload.product_id,
        payload.quantity.unwrap_or(1),
    )?;
    Ok(Json(ApiResponse::success_with_message("Item added to cart", cart)))
}

pub async fn update_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(item_id): Path<String>,
    payload: Result<Json<UpdateItemPayload>, JsonRejection>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let item_id = parse_id(&item_id, "cart item")?;
    let quantity = json_body(payload)?.quantity.ok_or_else(|| {
        AppError::validation_fields(vec![FieldError::new("quantity", "Quantity is required")])
    })?;
    let cart = state.carts.update_item(&user.id, item_id, quantity)?;
    Ok(Json(ApiResponse::success_with_message("Cart updated", cart)))
}

pub async fn remove_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(item_id): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let item_id = parse_id(&item_id, "cart item")?;
    let cart = state.carts.remove_item(&user.id, item_id)?;
    Ok(Json(ApiResponse::success_with_message("Item removed from cart", cart)))
}

pub async fn clear(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let cart = state.carts.clear(&user.id)?;
    Ok(Json(ApiResponse::success_with_message("Cart cleared", cart)))
}
