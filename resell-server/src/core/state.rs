//! 服务器状态
//!
//! [`ServerState`] 持有所有服务的共享引用，克隆成本很低 (内部全是 `Arc`/句柄)。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwtService;
use crate::carts::CartService;
use crate::checkout::CheckoutService;
use crate::core::tasks::{BackgroundTasks, TaskKind, run_idempotency_sweeper};
use crate::core::{Config, Result};
use crate::fees::{FeePolicy, SeededFeePolicy};
use crate::idempotency::IdempotencyStore;
use crate::orders::OrderService;
use crate::products::ProductService;
use crate::reviews::ReviewService;
use crate::storage::MarketStorage;

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 服务器配置 |
/// | storage | redb 存储 |
/// | jwt_service | JWT 验证 |
/// | fee_policy | 平台费策略 |
/// | idempotency | 幂等记录存储 |
/// | checkout / carts / orders / products / reviews | 业务服务 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: MarketStorage,
    pub jwt_service: Arc<JwtService>,
    pub fee_policy: Arc<dyn FeePolicy>,
    pub idempotency: IdempotencyStore,
    pub checkout: CheckoutService,
    pub carts: CartService,
    pub orders: OrderService,
    pub products: ProductService,
    pub reviews: ReviewService,
    started_at: Instant,
}

impl ServerState {
    /// 由已打开的存储组装全部服务
    ///
    /// 平台费使用 `ASSIGNMENT_SEED` 派生的 [`SeededFeePolicy`]。
    pub fn new(config: Config, storage: MarketStorage) -> Self {
        let fee_policy: Arc<dyn FeePolicy> =
            Arc::new(SeededFeePolicy::from_seed(&config.assignment_seed));
        Self::with_fee_policy(config, storage, fee_policy)
    }

    /// 指定平台费策略
    pub fn with_fee_policy(
        config: Config,
        storage: MarketStorage,
        fee_policy: Arc<dyn FeePolicy>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let idempotency = IdempotencyStore::new(storage.clone(), config.idempotency_ttl());
        let checkout =
            CheckoutService::new(storage.clone(), fee_policy.clone(), idempotency.clone());

        Self {
            carts: CartService::new(storage.clone()),
            orders: OrderService::new(storage.clone()),
            products: ProductService::new(storage.clone(), config.assignment_seed.clone()),
            reviews: ReviewService::new(storage.clone()),
            checkout,
            idempotency,
            fee_policy,
            jwt_service,
            storage,
            config,
            started_at: Instant::now(),
        }
    }

    /// 内存数据库，测试专用
    pub fn for_tests(config: Config) -> Result<Self> {
        Ok(Self::new(config, MarketStorage::open_in_memory()?))
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (database/, logs/)
    /// 2. 数据库 (work_dir/database/resell.redb)
    /// 3. 各业务服务
    pub async fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir_structure()?;

        let db_path: PathBuf = config.database_path();
        let storage = MarketStorage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database opened");

        let state = Self::new(config.clone(), storage);
        tracing::info!(
            fee_policy = state.fee_policy.name(),
            idempotency_ttl_secs = config.idempotency_ttl_secs,
            "Server state initialized"
        );
        Ok(state)
    }

    /// 启动后台任务
    ///
    /// - 过期幂等记录清理 (每 `IDEMPOTENCY_SWEEP_SECS` 秒)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let every = std::time::Duration::from_secs(self.config.idempotency_sweep_secs.max(1));
        let token = tasks.shutdown_token();
        tasks.spawn(
            "idempotency_sweeper",
            TaskKind::Periodic,
            run_idempotency_sweeper(self.idempotency.clone(), every, token),
        );

        tasks.log_summary();
        tasks
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 运行时间 (秒)
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
