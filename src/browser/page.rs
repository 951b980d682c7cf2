//! 页面能力
//!
//! `RenderPage` 描述渲染一次所需的页面操作，`ChromePage` 是 CDP 实现。
//! 每个请求独占一个页面，用完即关。

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FulfillRequestParams, HeaderEntry,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, SetCookiesParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, PrintToPdfParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::intercept::{self, InterceptDecision, InterceptRule};
use crate::error::RenderError;
use crate::models::{CookieSpec, SameSite};

/// A4 纸张尺寸（英寸）
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;

/// 轮询选择器的间隔
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 页面工厂：从共享浏览器中打开新页面
#[async_trait]
pub trait PageFactory: Send + Sync {
    async fn open_page(&self) -> Result<Box<dyn RenderPage>, RenderError>;
}

/// 单个页面上的渲染操作
#[async_trait]
pub trait RenderPage: Send {
    /// 注入 Cookie；未指定作用域的 Cookie 绑定到 `target_url`
    async fn set_cookies(&mut self, cookies: &[CookieSpec], target_url: &str)
        -> Result<(), RenderError>;

    /// 开启请求拦截
    async fn enable_interception(&mut self, rules: Vec<InterceptRule>) -> Result<(), RenderError>;

    /// 导航并等待 DOMContentLoaded 和 networkIdle
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// 等待选择器出现
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration)
        -> Result<(), RenderError>;

    /// 打印为 A4 纵向 PDF，包含背景
    async fn print_pdf(&mut self, timeout: Duration) -> Result<Vec<u8>, RenderError>;

    /// 关闭页面
    async fn close(&mut self) -> Result<(), RenderError>;
}

/// CDP 页面
pub struct ChromePage {
    page: Option<Page>,
    interception: Option<JoinHandle<()>>,
}

impl ChromePage {
    pub fn new(page: Page) -> Self {
        Self {
            page: Some(page),
            interception: None,
        }
    }

    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::page_setup("page already closed"))
    }

    fn stop_interception(&mut self) {
        if let Some(task) = self.interception.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl RenderPage for ChromePage {
    async fn set_cookies(
        &mut self,
        cookies: &[CookieSpec],
        target_url: &str,
    ) -> Result<(), RenderError> {
        let params = cookies
            .iter()
            .map(|cookie| cookie_param(cookie, target_url))
            .collect::<Result<Vec<_>, _>>()
            .map_err(RenderError::page_setup)?;

        // 直接调用 Network.setCookies，about:blank 上也可以设置
        self.page()?
            .execute(SetCookiesParams::new(params))
            .await
            .map_err(RenderError::page_setup)?;
        debug!("已注入 {} 个 Cookie", cookies.len());
        Ok(())
    }

    async fn enable_interception(&mut self, rules: Vec<InterceptRule>) -> Result<(), RenderError> {
        let page = self.page()?.clone();

        // 先订阅再开启，避免漏掉第一批请求
        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(RenderError::page_setup)?;
        page.execute(EnableParams::default())
            .await
            .map_err(RenderError::page_setup)?;

        let rule_count = rules.len();
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                if let Err(e) = answer_paused_request(&page, &event, &rules).await {
                    debug!("处理拦截请求失败 {}: {}", event.request.url, e);
                }
            }
        });
        self.stop_interception();
        self.interception = Some(task);
        debug!("已开启请求拦截，规则数: {}", rule_count);
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        let page = self.page()?;
        let timeout_ms = timeout.as_millis() as u64;

        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| RenderError::navigation(url, e))?;
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| RenderError::navigation(url, e))?;

        let navigation = async {
            let response = page
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| RenderError::navigation(url, e))?;
            if let Some(error_text) = response.result.error_text.as_deref() {
                if !error_text.is_empty() {
                    return Err(RenderError::navigation(url, error_text));
                }
            }

            // 同文档导航没有 loader，无需等待生命周期事件
            let Some(loader_id) = response.result.loader_id.clone() else {
                return Ok(());
            };

            let mut dom_ready = false;
            let mut network_idle = false;
            while let Some(event) = lifecycle.next().await {
                if event.loader_id != loader_id {
                    continue;
                }
                match event.name.as_str() {
                    "DOMContentLoaded" => dom_ready = true,
                    "networkIdle" => network_idle = true,
                    _ => {}
                }
                if dom_ready && network_idle {
                    return Ok(());
                }
            }
            Err(RenderError::navigation(url, "lifecycle event stream closed"))
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| RenderError::Timeout {
                phase: "navigation",
                timeout_ms,
            })?
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let page = self.page()?;
        let found = tokio::time::timeout(timeout, async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                sleep(SELECTOR_POLL_INTERVAL).await;
            }
        })
        .await;

        found.map_err(|_| RenderError::SelectorTimeout {
            selector: selector.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    async fn print_pdf(&mut self, timeout: Duration) -> Result<Vec<u8>, RenderError> {
        let page = self.page()?;
        let params = PrintToPdfParams {
            print_background: Some(true),
            landscape: Some(false),
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            ..Default::default()
        };

        tokio::time::timeout(timeout, page.pdf(params))
            .await
            .map_err(|_| RenderError::Timeout {
                phase: "pdf rendering",
                timeout_ms: timeout.as_millis() as u64,
            })?
            .map_err(RenderError::print)
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.stop_interception();
        match self.page.take() {
            Some(page) => page.close().await.map_err(RenderError::page_setup),
            None => Ok(()),
        }
    }
}

impl Drop for ChromePage {
    /// 请求被取消时页面仍需关闭
    fn drop(&mut self) {
        self.stop_interception();
        if let Some(page) = self.page.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        warn!("后台关闭页面失败: {}", e);
                    }
                });
            }
        }
    }
}

/// 按规则回应一个被暂停的请求
async fn answer_paused_request(
    page: &Page,
    event: &EventRequestPaused,
    rules: &[InterceptRule],
) -> Result<(), CdpError> {
    match intercept::decide(&event.request.url, rules) {
        InterceptDecision::Fulfill(mock) => {
            debug!("拦截请求: {}", event.request.url);
            let mut params =
                FulfillRequestParams::new(event.request_id.clone(), i64::from(mock.status));
            params.response_headers = Some(vec![HeaderEntry::new(
                "Content-Type",
                mock.content_type,
            )]);
            params.body = Some(BASE64.encode(&mock.body).into());
            page.execute(params).await?;
        }
        InterceptDecision::Continue => {
            page.execute(ContinueRequestParams::new(event.request_id.clone()))
                .await?;
        }
    }
    Ok(())
}

/// 转换为 CDP Cookie 参数
fn cookie_param(cookie: &CookieSpec, target_url: &str) -> Result<CookieParam, String> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone());

    if let Some(url) = cookie.scope_url(target_url) {
        builder = builder.url(url);
    }
    if let Some(domain) = &cookie.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(path) = &cookie.path {
        builder = builder.path(path.clone());
    }
    if let Some(expires) = cookie.expires {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    if let Some(http_only) = cookie.http_only {
        builder = builder.http_only(http_only);
    }
    if let Some(secure) = cookie.secure {
        builder = builder.secure(secure);
    }
    if let Some(same_site) = cookie.same_site {
        builder = builder.same_site(match same_site {
            SameSite::Strict => CookieSameSite::Strict,
            SameSite::Lax => CookieSameSite::Lax,
            SameSite::None => CookieSameSite::None,
        });
    }
    builder.build()
}
