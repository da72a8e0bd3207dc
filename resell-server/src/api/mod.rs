//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`checkout`] - 下单与买家订单
//! - [`cart`] - 购物车
//! - [`seller`] - 卖家订单与评价
//! - [`products`] - 商品
//! - [`reviews`] - 评价

pub mod cart;
pub mod checkout;
pub mod health;
pub mod products;
pub mod reviews;
pub mod seller;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use shared::error::FieldError;
use shared::models::{OrderStatus, PageRequest};

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};

/// `?page=&limit=` (非法值按缺省处理)
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// 仅卖家订单列表使用
    pub status: Option<String>,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(lenient(&self.page), lenient(&self.limit))
    }

    /// `status` 过滤; 空串视为不过滤
    pub fn status_filter(&self) -> AppResult<Option<OrderStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_status(raw).map(Some),
        }
    }
}

fn lenient(raw: &Option<String>) -> Option<u32> {
    raw.as_deref().and_then(|s| s.trim().parse().ok())
}

/// `{ "status": "shipped" }`
#[derive(Debug, Default, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub status: String,
}

pub fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.parse().map_err(|_| {
        AppError::validation_fields(vec![FieldError::new("status", "Invalid status")])
    })
}

/// Unwrap a JSON body, reporting malformed input through the API envelope
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(AppError::invalid_request(rejection.body_text())),
    }
}

/// Path id -> i64
pub fn parse_id(raw: &str, resource: &str) -> AppResult<i64> {
    raw.parse()
        .map_err(|_| AppError::invalid_request(format!("Invalid {resource} id")))
}
