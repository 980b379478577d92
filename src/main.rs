use bookkeeping_recon::{api, open_store, AppConfig, AppError, BookkeepingService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_max_level(config.log.max_level().unwrap_or(tracing::Level::INFO))
        .init();

    info!("Starting server with config: {:?}", config);

    // 打开记录存储
    let store = open_store(&config).await?;
    let service = Arc::new(BookkeepingService::from_config(store.clone(), &config));
    let app = api::router(api::AppState::new(service, config.api.clone()));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /invoices, GET /invoices");
    info!("  POST /bank-transactions, GET /bank-transactions");
    info!("  POST /match            - reconcile invoices against bank transactions");
    info!("  GET  /matches, GET /matches/export");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 释放存储连接
    store.close().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
