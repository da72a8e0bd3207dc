//! ResellHub Server - 二手交易市场的下单与订单子系统
//!
//! # 架构概述
//!
//! - **下单** (`checkout`): 购物车 → 订单，库存扣减、平台费、幂等重放在同一个写事务内完成
//! - **存储** (`storage`): 嵌入式 redb，JSON 值
//! - **认证** (`auth`): 只验证外部签发的 JWT
//! - **HTTP API** (`api`): axum 路由和处理器
//!
//! # 模块结构
//!
//! ```text
//! resell-server/src/
//! ├── core/          # 配置、状态、错误、服务器、后台任务
//! ├── auth/          # JWT 验证、当前用户
//! ├── storage/       # redb 表与读写
//! ├── fees/          # 平台费策略
//! ├── inventory/     # 库存校验与扣减
//! ├── idempotency/   # 幂等记录
//! ├── checkout/      # 下单编排
//! ├── carts/         # 购物车
//! ├── orders/        # 订单查询与状态机
//! ├── products/      # 商品
//! ├── reviews/       # 评价与卖家评分
//! ├── services/      # 路由装配、响应签名
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、校验
//! ```

pub mod api;
pub mod auth;
pub mod carts;
pub mod checkout;
pub mod core;
pub mod fees;
pub mod idempotency;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use services::app::build_app;
pub use storage::MarketStorage;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

pub use utils::logger::init_logger;

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
    ____                  ____   __  __      __
   / __ \___  ________  / / /  / / / /_  __/ /_
  / /_/ / _ \/ ___/ _ \/ / /  / /_/ / / / / __ \
 / _, _/  __(__  )  __/ / /  / __  / /_/ / /_/ /
/_/ |_|\___/____/\___/_/_/  /_/ /_/\__,_/_.___/
    "#
    );
}
