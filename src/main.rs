mod api;
mod application;
mod domain;
mod infrastructure;
mod ports;

use api::AppState;
use application::PaymentService;
use infrastructure::{
    EsewaConfig, EsewaGatewayAdapter, KhaltiAdapter, KhaltiConfig, MySqlOrderRepository,
    ServerConfig,
};
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting storefront payment service...");

    // 配置缺失直接退出，不带着半套密钥发起支付
    let server_config = ServerConfig::from_env()?;
    let esewa_config = EsewaConfig::from_env()?;
    info!(
        "eSewa configuration loaded for merchant: {}",
        esewa_config.merchant_code
    );
    let khalti_config = KhaltiConfig::from_env()?;
    info!("Khalti configuration loaded, api: {}", khalti_config.base_url);

    // 创建数据库连接池
    info!("Connecting to database...");
    let pool = MySqlPool::connect(&server_config.database_url).await?;
    info!("Database connected successfully");

    // 创建适配器与仓储
    let esewa_adapter = Arc::new(EsewaGatewayAdapter::new(esewa_config)?);
    let khalti_adapter = Arc::new(KhaltiAdapter::new(khalti_config)?);
    let repository = Arc::new(MySqlOrderRepository::new(Arc::new(pool)));

    // 创建支付服务
    let payment_service = Arc::new(PaymentService::new(
        esewa_adapter,
        khalti_adapter,
        repository,
    ));

    let app_state = AppState {
        payment_service,
        public_base_url: Arc::from(server_config.public_base_url.as_str()),
    };
    let app = api::create_router(app_state)?;

    let addr = server_config.bind_addr();
    info!("Server listening on {}", addr);
    info!("Available endpoints:");
    info!("  GET  /health - Health check");
    info!("  POST /api/orders - Create order");
    info!("  GET  /api/orders/:transaction_id - Query order");
    info!("  POST /api/payments/esewa - eSewa signed form payload");
    info!("  GET  /payments/esewa/:transaction_id/checkout - eSewa auto-submit page");
    info!("  POST /api/payments/khalti - Khalti payment initiation");
    info!("  GET  /payment/esewa/success - eSewa success callback");
    info!("  GET  /payment/esewa/failure - eSewa failure callback");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
