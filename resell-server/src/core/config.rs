use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{JwtConfig, JwtError};

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./work_dir | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 5000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | ASSIGNMENT_SEED | default-seed | 平台费种子 / 响应签名密钥 |
/// | IDEMPOTENCY_TTL_SECS | 300 | 幂等记录保留时长 |
/// | IDEMPOTENCY_SWEEP_SECS | 60 | 过期幂等记录清理间隔 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 优雅关闭等待(毫秒) |
///
/// JWT 相关变量见 [`JwtConfig::from_env`]。
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/resell HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// tracing EnvFilter 指令
    pub log_level: String,
    /// 平台费种子，同时作为响应签名密钥
    pub assignment_seed: String,
    /// 幂等记录保留时长 (秒)
    pub idempotency_ttl_secs: u64,
    /// 过期幂等记录清理间隔 (秒)
    pub idempotency_sweep_secs: u64,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值。只有 JWT 密钥配置错误会失败。
    pub fn from_env() -> Result<Self, JwtError> {
        Ok(Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            jwt: JwtConfig::from_env()?,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            assignment_seed: std::env::var("ASSIGNMENT_SEED")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "default-seed".into()),
            idempotency_ttl_secs: std::env::var("IDEMPOTENCY_TTL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(300),
            idempotency_sweep_secs: std::env::var("IDEMPOTENCY_SWEEP_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        })
    }

    /// 测试/嵌入场景使用的固定配置，不读取环境变量
    pub fn for_tests(work_dir: impl Into<String>, jwt: JwtConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            http_port: 0,
            jwt,
            environment: "test".into(),
            log_level: "debug".into(),
            assignment_seed: "default-seed".into(),
            idempotency_ttl_secs: 300,
            idempotency_sweep_secs: 60,
            request_timeout_ms: 30000,
            shutdown_timeout_ms: 1000,
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// redb 数据库文件路径: `work_dir/database/resell.redb`
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("resell.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}
