//! HTTP 层
//!
//! 只做参数校验、关联 ID 和错误映射，具体工作交给渲染服务和压缩器。

pub mod handlers;
pub mod middleware;
pub mod request;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::compression::Compressor;
use crate::models::DEFAULT_MAX_RENDER_TIMEOUT;
use crate::services::RenderService;

pub use middleware::{new_correlation_id, RequestContext};

/// handler 共享的状态
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<RenderService>,
    pub compressor: Arc<dyn Compressor>,
    pub default_timeout: Duration,
    /// 请求可申请的最长超时
    pub max_timeout: Duration,
}

impl AppState {
    pub fn new(
        renderer: Arc<RenderService>,
        compressor: Arc<dyn Compressor>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            compressor,
            default_timeout,
            max_timeout: DEFAULT_MAX_RENDER_TIMEOUT.max(default_timeout),
        }
    }

    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self.default_timeout = self.default_timeout.min(max_timeout);
        self
    }
}

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/evwebpdfhealth", get(handlers::health))
        .route(
            "/generateReport/{url}",
            get(handlers::generate_report_from_path),
        )
        .route("/generateReport", post(handlers::generate_report))
        .route("/compressPdf/{dpi}", post(handlers::compress_pdf))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn(middleware::assign_correlation_id))
        .with_state(state)
}
