//! 认证中间件

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::Method;

use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;
use crate::utils::AppError;

/// 无需认证的 API 路由
///
/// - `/api/health/*`
/// - `GET /api/products/{id}`
/// - `GET /api/reviews/product/{id}`, `GET /api/reviews/seller/{id}`
pub fn is_public_route(method: &Method, path: &str) -> bool {
    if path == "/api/health" || path.starts_with("/api/health/") {
        return true;
    }
    if method != Method::GET {
        return false;
    }
    if let Some(rest) = path.strip_prefix("/api/products/") {
        return !rest.is_empty() && !rest.contains('/');
    }
    path.starts_with("/api/reviews/product/") || path.starts_with("/api/reviews/seller/")
}

/// 认证中间件 - 要求用户登录
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT。
/// 验证成功后将 [`CurrentUser`] 注入请求扩展。
///
/// # 跳过认证的路径
///
/// - `OPTIONS *` (CORS 预检)
/// - 非 `/api/` 路径
/// - [`is_public_route`] 列出的公共路由
///
/// # 错误处理
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 无 Authorization 头 | 401 NotAuthenticated |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 | 401 TokenInvalid |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // 非 API 路由跳过认证 (让它们正常返回 404)
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    if is_public_route(req.method(), path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::not_authenticated());
        }
    };

    match state.get_jwt_service().validate_token(token) {
        Ok(claims) => {
            let user = CurrentUser::from(claims);
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", req.uri())
            );

            match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        assert!(is_public_route(&Method::GET, "/api/health/healthz"));
        assert!(is_public_route(&Method::GET, "/api/products/42"));
        assert!(is_public_route(&Method::GET, "/api/reviews/product/42"));
        assert!(is_public_route(&Method::GET, "/api/reviews/seller/u1"));
    }

    #[test]
    fn test_protected_routes() {
        assert!(!is_public_route(&Method::PUT, "/api/products/42"));
        assert!(!is_public_route(&Method::POST, "/api/products/42/like"));
        assert!(!is_public_route(&Method::GET, "/api/products/42/like"));
        assert!(!is_public_route(&Method::POST, "/api/checkout"));
        assert!(!is_public_route(&Method::GET, "/api/reviews/my-reviews"));
        assert!(!is_public_route(&Method::GET, "/api/cart"));
    }
}
