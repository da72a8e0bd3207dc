use std::time::{Duration, Instant};

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use crate::auth::require_auth;
use crate::core::ServerState;
use crate::utils::AppError;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;

    tracing::info!(target: "http_access", latency_ms, "{} {} {}", method, uri, status);

    response
}

async fn not_found() -> AppError {
    AppError::not_found("Route")
}

/// Build the Axum router (without state)
///
/// `request_timeout` 作用于除下单外的所有路由
pub fn build_routes(request_timeout: Duration) -> Router<ServerState> {
    let bounded = Router::<ServerState>::new()
        .merge(crate::api::health::router())
        .merge(crate::api::checkout::router())
        .merge(crate::api::cart::router())
        .merge(crate::api::seller::router())
        .merge(crate::api::products::router())
        .merge(crate::api::reviews::router())
        .layer(TimeoutLayer::new(request_timeout));

    bounded
        .merge(crate::api::checkout::checkout_router())
        .fallback(not_found)
}

/// 完整应用: 路由 + 认证 + Tower 中间件
pub fn build_app(state: ServerState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms.max(1));

    build_routes(timeout)
        // require_auth 内部会跳过公共路由
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(log_request))
}
