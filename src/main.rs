// VPS Master - 本地后端服务
// 应用入口

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use vpsmaster::api::{self, AppState};
use vpsmaster::services::session::{RusshConnector, SessionManager};
use vpsmaster::services::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统
    // 可以通过 RUST_LOG 环境变量控制日志级别，例如：RUST_LOG=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false) // 不显示 target（模块路径）
        .init();

    let settings = storage::load_settings().context("无法加载设置")?;
    let addr = settings.server.listen_addr();

    let sessions = SessionManager::new(
        Arc::new(RusshConnector),
        settings.connection.clone(),
        settings.sftp.clone(),
    );
    let state = Arc::new(AppState::new(sessions, settings));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    info!("[HTTP] VPS Master backend listening on {}", addr);

    axum::serve(listener, api::router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    // 退出前断开远程会话
    state.sessions.disconnect().await;
    info!("[HTTP] Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[HTTP] Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("[HTTP] Shutdown signal received");
}
