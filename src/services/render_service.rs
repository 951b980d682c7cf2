//! 渲染服务 - 业务能力层
//!
//! 把一个 [`RenderRequest`] 变成 PDF：打开页面 → 配置 → 导航 → 等待选择器 →
//! 打印 → 关闭页面 →（可选）压缩。

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::browser::{PageFactory, RenderPage};
use crate::compression::Compressor;
use crate::error::RenderError;
use crate::models::RenderRequest;
use crate::utils::trace_phase;

/// 渲染服务
///
/// 职责：
/// - 每个请求独占一个页面，任何出口都会关闭页面
/// - 导航、等待和打印共用同一个超时预算
/// - 限制同时打开的页面数量
pub struct RenderService {
    pages: Arc<dyn PageFactory>,
    compressor: Arc<dyn Compressor>,
    permits: Arc<Semaphore>,
}

impl RenderService {
    pub fn new(
        pages: Arc<dyn PageFactory>,
        compressor: Arc<dyn Compressor>,
        max_concurrent_pages: usize,
    ) -> Self {
        Self {
            pages,
            compressor,
            permits: Arc::new(Semaphore::new(max_concurrent_pages.max(1))),
        }
    }

    /// 渲染为 PDF 字节
    pub async fn render(
        &self,
        request: &RenderRequest,
        correlation_id: &str,
    ) -> Result<Vec<u8>, RenderError> {
        self.render_since(request, correlation_id, Instant::now()).await
    }

    /// 同 [`RenderService::render`]，阶段开始日志的耗时从 `received_at` 算起
    pub async fn render_since(
        &self,
        request: &RenderRequest,
        correlation_id: &str,
        received_at: Instant,
    ) -> Result<Vec<u8>, RenderError> {
        let url = request.normalized_url();

        // 信号量不会被关闭
        let permit = self.permits.acquire().await.ok();
        trace_phase(&format!("开始渲染 {}", url), received_at, correlation_id);

        let start = Instant::now();

        let mut page = self.pages.open_page().await?;
        let outcome = self.drive(page.as_mut(), request, &url).await;
        if let Err(e) = page.close().await {
            warn!(correlation_id = correlation_id, "关闭页面失败: {}", e);
        }
        drop(permit);

        let pdf = outcome?;
        trace_phase(
            &format!("渲染完成 ({} 字节)", pdf.len()),
            start,
            correlation_id,
        );

        let settings = request.compression;
        if !settings.enabled {
            return Ok(pdf);
        }

        trace_phase("开始压缩", received_at, correlation_id);
        let start = Instant::now();
        let compressed = self
            .compressor
            .compress(
                Bytes::from(pdf),
                i64::from(settings.resolution),
                i64::from(settings.quality),
            )
            .await?;
        trace_phase(
            &format!("压缩完成 ({} 字节)", compressed.len()),
            start,
            correlation_id,
        );
        Ok(compressed)
    }

    /// 在页面上依次执行渲染步骤
    async fn drive(
        &self,
        page: &mut dyn RenderPage,
        request: &RenderRequest,
        url: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let deadline = Instant::now() + request.timeout;
        let budget_ms = request.timeout.as_millis() as u64;

        if !request.cookies.is_empty() {
            page.set_cookies(&request.cookies, url).await?;
        }
        if !request.intercept.is_empty() {
            page.enable_interception(request.intercept.clone()).await?;
        }

        page.navigate(url, remaining(deadline, "navigation", budget_ms)?)
            .await?;
        debug!("导航完成: {}", url);

        // 选择器在导航之后等待，针对的是目标文档
        page.wait_for_selector(
            &request.wait_for_selector,
            remaining(deadline, "selector wait", budget_ms)?,
        )
        .await?;

        page.print_pdf(remaining(deadline, "pdf rendering", budget_ms)?)
            .await
    }
}

/// 剩余的超时预算，已用完则报超时
fn remaining(deadline: Instant, phase: &'static str, budget_ms: u64) -> Result<Duration, RenderError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(RenderError::Timeout {
            phase,
            timeout_ms: budget_ms,
        });
    }
    Ok(left)
}
