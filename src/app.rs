//! 应用生命周期
//!
//! 启动顺序：日志 → 浏览器 → 路由 → 监听端口；
//! 关闭顺序：停止接收 → 等待在途请求 → 关闭浏览器。

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

use crate::browser::BrowserHandle;
use crate::compression::{Compressor, GhostscriptCompressor};
use crate::config::Config;
use crate::http::{self, AppState};
use crate::server;
use crate::services::RenderService;
use crate::utils::logging::log_startup;

/// 应用主结构
pub struct App {
    config: Config,
    browser: Arc<BrowserHandle>,
    state: AppState,
}

impl App {
    /// 初始化应用，浏览器在监听端口之前就绪
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let browser = Arc::new(BrowserHandle::launch(&config).await?);
        let compressor: Arc<dyn Compressor> = Arc::new(GhostscriptCompressor::from_config(&config));
        let renderer = Arc::new(RenderService::new(
            browser.clone(),
            compressor.clone(),
            config.max_concurrent_pages,
        ));
        let state = AppState::new(renderer, compressor, config.render_timeout())
            .with_max_timeout(config.max_render_timeout());

        Ok(Self {
            config,
            browser,
            state,
        })
    }

    /// 运行服务直到收到退出信号
    pub async fn run(self) -> Result<()> {
        let router = http::build_router(self.state.clone(), self.config.max_body_bytes);
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(addr).await?;
        info!("✅ 服务已启动: http://{}", addr);

        let served = server::serve(listener, router, shutdown_signal()).await;

        self.browser.shutdown().await;
        info!("👋 服务已退出");
        served.map_err(Into::into)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("监听 Ctrl+C 失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("监听 SIGTERM 失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl+C，准备退出"),
        _ = terminate => info!("收到 SIGTERM，准备退出"),
    }
}
