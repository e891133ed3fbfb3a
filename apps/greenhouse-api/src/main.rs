//! 温室告警与联锁 HTTP API。
//!
//! 启动流程：加载 `.env` → 读取配置 → 初始化日志 → 按配置选择存储 → 启动 HTTP 服务。

mod handlers;
mod middleware;
mod routes;
mod state;
mod utils;


use axum::Router;
use domain::SystemClock;
use greenhouse_config::AppConfig;
use greenhouse_telemetry::init_tracing;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::{AppState, Stores};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    let stores = Stores::from_config(&config).await?;
    let state = AppState::new(stores, &config, Arc::new(SystemClock));
    let app = build_app(state);

    info!(
        target: "greenhouse.api",
        http_addr = %config.http_addr,
        storage = ?config.storage,
        redis = config.redis_url.is_some(),
        alarm_auto_clear = config.alarm_auto_clear,
        "server_starting"
    );
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 组装路由：同时挂载在 `/` 与 `/api` 下，并注入 request_id / trace_id。
pub fn build_app(state: AppState) -> Router {
    let api = routes::create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_context))
                .layer(TraceLayer::new_for_http()),
        )
}
