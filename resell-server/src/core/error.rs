//! 服务器启动/运行错误
//!
//! 请求级错误统一使用 [`AppError`]，这里只覆盖进程生命周期内的失败。

use shared::AppError;
use thiserror::Error;

use crate::auth::JwtError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(#[from] JwtError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServerError> for AppError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Config(e) => AppError::with_message(shared::ErrorCode::ConfigError, e.to_string()),
            ServerError::Storage(e) => e.into(),
            other => AppError::internal(other.to_string()),
        }
    }
}

/// 服务器 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorCode;

    #[test]
    fn test_config_error_maps_to_config_code() {
        let err: AppError = ServerError::Config(JwtError::ConfigError("short".into())).into();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[test]
    fn test_io_error_is_internal() {
        let io = std::io::Error::other("disk gone");
        let err: AppError = ServerError::from(io).into();
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}
