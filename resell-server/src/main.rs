use resell_server::{Config, Server, ServerState, init_logger, print_banner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();

    // 2. 加载配置
    let config = Config::from_env()?;
    config.ensure_work_dir_structure()?;

    // 3. 日志: 生产环境输出 JSON 并写入滚动文件
    let log_dir = config.log_dir();
    init_logger(
        &config.log_level,
        config.is_production(),
        config.is_production().then_some(log_dir.as_path()),
    )?;

    print_banner();
    tracing::info!(environment = %config.environment, "ResellHub server starting...");

    // 4. 初始化服务器状态
    let state = ServerState::initialize(&config).await?;

    // 5. 启动 HTTP 服务器 (Server::run 会自动启动后台任务)
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
