//! # Surprise Gate - 主程序入口
//!
//! 惊喜页面的后端服务。
//!
//! ## 功能概述
//! - 校验访问密码，返回惊喜音频的绝对地址
//! - 接收访客留言，保存在进程内有上限的缓冲区中
//! - 可选的运维接口，用于查看或清空留言
//!
//! ## 服务设计
//! - **PORT（默认 8888）**: 对外服务
//!   - `/api/authenticate` → 密码校验 / 音频地址
//!   - `/api/save-reaction` → 保存留言
//! - **ADMIN_PORT（可选）**: 运维接口，默认只监听 127.0.0.1
//!   - `/reactions` → GET 查看 / DELETE 清空

mod config;
mod error;
mod handlers;
mod state;

use config::Config;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 程序入口点
///
/// ### 启动流程
/// 1. 初始化日志系统
/// 2. 加载配置
/// 3. 初始化应用状态
/// 4. 启动运维接口（如已配置）
/// 5. 启动 HTTP 服务
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========================================
    // 1. 初始化日志系统
    // ========================================
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("正在启动 surprise-gate...");

    // ========================================
    // 2. 加载配置
    // ========================================
    let config = Config::from_env();

    // ========================================
    // 3. 初始化应用状态
    // ========================================
    let state = Arc::new(AppState::from_env());

    // ========================================
    // 4. 启动运维接口
    // ========================================
    let admin_task = match config.admin_addr() {
        Some(admin_addr) => {
            let admin_addr: SocketAddr = admin_addr.parse()?;
            let listener = tokio::net::TcpListener::bind(admin_addr).await?;
            let app = handlers::admin_router(state.clone());
            info!("运维接口监听于 {}", admin_addr);
            Some(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!("运维接口异常退出: {}", e);
                }
            }))
        }
        None => None,
    };

    // ========================================
    // 5. 启动 HTTP 服务
    // ========================================
    let addr: SocketAddr = config.addr().parse()?;
    let app = handlers::router(state);

    info!("服务启动成功，监听于 {}", addr);
    info!("  /api/authenticate   → 密码校验");
    info!("  /api/save-reaction  → 保存留言");

    let tcp_listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(tcp_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = admin_task {
        task.abort();
    }

    info!("surprise-gate 已停止");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听以下信号并触发关闭流程：
/// - Ctrl+C (SIGINT)
/// - SIGTERM (仅 Unix 系统)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("无法安装 Ctrl+C 处理器: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("无法安装信号处理器: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    // 非 Unix 系统使用永不完成的 Future
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到 Ctrl+C");
        },
        _ = terminate => {
            info!("收到 terminate 信号");
        },
    }
}
