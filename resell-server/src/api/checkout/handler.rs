//! Checkout API Handlers

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use serde::Deserialize;
use shared::models::{Order, PaymentMethod, ShippingAddress};
use validator::{Validate, ValidationError};

use crate::api::{PageQuery, StatusPayload, json_body, parse_id, parse_status};
use crate::auth::CurrentUser;
use crate::checkout::CheckoutRequest;
use crate::core::ServerState;
use crate::orders::OrderPage;
use crate::services::signature::{SIGNATURE_HEADER, sign_body};
use crate::utils::validation::validation_error;
use crate::utils::{ApiResponse, AppError, AppResult};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
pub const REPLAYED_HEADER: &str = "idempotent-replayed";

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn payment_method(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<PaymentMethod>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("payment_method"))
}

/// Shipping address as sent by the client; every field defaults to empty so
/// missing fields surface as validation errors instead of a parse failure
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddressInput {
    #[validate(
        custom(function = "not_blank", message = "First name is required"),
        length(max = 100, message = "First name is too long")
    )]
    pub first_name: String,
    #[validate(
        custom(function = "not_blank", message = "Last name is required"),
        length(max = 100, message = "Last name is too long")
    )]
    pub last_name: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(max = 100, message = "Phone is too long"))]
    pub phone: Option<String>,
    #[validate(
        custom(function = "not_blank", message = "Address is required"),
        length(max = 500, message = "Address is too long")
    )]
    pub address: String,
    #[validate(
        custom(function = "not_blank", message = "City is required"),
        length(max = 100, message = "City is too long")
    )]
    pub city: String,
    #[validate(
        custom(function = "not_blank", message = "Country is required"),
        length(max = 100, message = "Country is too long")
    )]
    pub country: String,
}

impl From<ShippingAddressInput> for ShippingAddress {
    fn from(input: ShippingAddressInput) -> Self {
        Self {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email.trim().to_string(),
            phone: input
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            address: input.address.trim().to_string(),
            city: input.city.trim().to_string(),
            country: input.country.trim().to_string(),
        }
    }
}

/// `POST /api/checkout` body
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutPayload {
    #[validate(nested)]
    pub shipping_address: ShippingAddressInput,
    #[validate(custom(function = "payment_method", message = "Valid payment method is required"))]
    pub payment_method: String,
}

impl CheckoutPayload {
    /// Validate and convert into the orchestrator's input
    pub fn into_request(self) -> AppResult<CheckoutRequest> {
        self.validate().map_err(|e| validation_error(&e))?;
        let payment_method = self
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(AppError::validation)?;
        Ok(CheckoutRequest {
            shipping_address: self.shipping_address.into(),
            payment_method,
        })
    }
}

/// Blank header means "no key"; anything else goes to the orchestrator,
/// which rejects oversized keys
fn idempotency_key(headers: &HeaderMap) -> AppResult<Option<String>> {
    match headers.get(IDEMPOTENCY_KEY_HEADER) {
        None => Ok(None),
        Some(value) => {
            let key = value
                .to_str()
                .map_err(|_| AppError::new(shared::ErrorCode::IdempotencyKeyInvalid))?
                .trim();
            Ok((!key.is_empty()).then(|| key.to_string()))
        }
    }
}

/// Place an order from the caller's cart
///
/// Success is `201` with the exact recorded body; replays return the same
/// bytes plus `Idempotent-Replayed: true`. Every 2xx is signed.
pub async fn checkout(
    State(state): State<ServerState>,
    user: CurrentUser,
    headers: HeaderMap,
    payload: Result<Json<CheckoutPayload>, JsonRejection>,
) -> AppResult<Response> {
    let request = json_body(payload)?.into_request()?;
    let key = idempotency_key(&headers)?;

    let service = state.checkout.clone();
    let user_id = user.id.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        service.checkout(&user_id, &request, key.as_deref())
    })
    .await
    .map_err(|e| AppError::internal(format!("Checkout task failed: {e}")))??;

    let replayed = outcome.is_replayed();
    let recorded = outcome.into_inner();
    let status = StatusCode::from_u16(recorded.status).unwrap_or(StatusCode::CREATED);

    let signature = status
        .is_success()
        .then(|| sign_body(&state.config.assignment_seed, recorded.body.as_bytes()));

    let mut response = (status, recorded.body).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Some(signature) = signature
        && let Ok(value) = HeaderValue::from_str(&signature)
    {
        response_headers.insert(SIGNATURE_HEADER, value);
    }
    if replayed {
        response_headers.insert(REPLAYED_HEADER, HeaderValue::from_static("true"));
    }
    Ok(response)
}

/// Buyer's order history
pub async fn order_history(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<OrderPage>>> {
    let page = state.orders.order_history(&user.id, query.page_request())?;
    Ok(Json(ApiResponse::success(page)))
}

/// Order detail (buyer only)
pub async fn order_detail(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order_id = parse_id(&id, "order")?;
    let order = state.orders.order_detail(&user.id, order_id)?;
    Ok(Json(ApiResponse::success(order)))
}

/// Status transition by a seller on the order
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
        order,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> CheckoutPayload {
        serde_json::from_value(serde_json::json!({
            "shippingAddress": {
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "address": "1 Analytical Way",
                "city": "London",
                "country": "UK"
            },
            "paymentMethod": "paypal"
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_payload_converts() {
        let request = valid_payload().into_request().unwrap();
        assert_eq!(request.payment_method, PaymentMethod::Paypal);
        assert_eq!(request.shipping_address.city, "London");
        assert_eq!(request.shipping_address.phone, None);
    }

    #[test]
    fn test_empty_body_lists_every_missing_field() {
        let err = CheckoutPayload::default().into_request().unwrap_err();
        let errors = err.details.unwrap().remove("errors").unwrap();
        let fields: Vec<&str> = errors
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();

        assert_eq!(
            fields,
            vec![
                "paymentMethod",
                "shippingAddress.address",
                "shippingAddress.city",
                "shippingAddress.country",
                "shippingAddress.email",
                "shippingAddress.firstName",
                "shippingAddress.lastName",
            ]
        );
    }

    #[test]
    fn test_unknown_payment_method_rejected() {
        let mut payload = valid_payload();
        payload.payment_method = "bitcoin".into();
        let err = payload.into_request().unwrap_err();
        let errors = err.details.unwrap().remove("errors").unwrap();
        assert_eq!(errors[0]["field"], "paymentMethod");
        assert_eq!(errors[0]["message"], "Valid payment method is required");
    }

    #[test]
    fn test_blank_idempotency_header_is_ignored() {
        let mut headers = HeaderMap::new();
        assert_eq!(idempotency_key(&headers).unwrap(), None);

        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("   "));
        assert_eq!(idempotency_key(&headers).unwrap(), None);

        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static(" abc "));
        assert_eq!(idempotency_key(&headers).unwrap(), Some("abc".to_string()));
    }
}
