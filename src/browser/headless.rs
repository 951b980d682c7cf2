use std::sync::Mutex;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::page::{ChromePage, PageFactory, RenderPage};
use crate::config::Config;
use crate::error::RenderError;

/// 进程内唯一的浏览器实例
///
/// 启动时创建，所有请求共享；每个请求从这里打开自己的页面。
/// 必须在监听端口之前就绪，进程退出前调用 [`BrowserHandle::shutdown`]。
pub struct BrowserHandle {
    browser: RwLock<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
}

impl BrowserHandle {
    /// 启动无头浏览器
    pub async fn launch(config: &Config) -> Result<Self, RenderError> {
        info!("🚀 启动无头浏览器...");

        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .request_timeout(config.max_render_timeout())
            .args(vec![
                "--disable-gpu",           // 容器内没有 GPU
                "--disable-dev-shm-usage", // 防止共享内存不足
                "--hide-scrollbars",
            ]);
        if let Some(executable) = &config.chrome_executable {
            debug!("浏览器路径: {}", executable);
            builder = builder.chrome_executable(executable);
        }
        let browser_config = builder.build().map_err(|e| {
            error!("配置无头浏览器失败: {}", e);
            RenderError::LaunchFailed { message: e }
        })?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            error!("启动无头浏览器失败: {}", e);
            RenderError::LaunchFailed {
                message: e.to_string(),
            }
        })?;

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("浏览器事件处理出错: {}", e);
                }
            }
            debug!("浏览器事件循环结束");
        });

        info!("✅ 无头浏览器已启动");
        Ok(Self {
            browser: RwLock::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
        })
    }

    /// 关闭浏览器，之后打开页面会返回 [`RenderError::BrowserClosed`]
    pub async fn shutdown(&self) {
        let Some(mut browser) = self.browser.write().await.take() else {
            return;
        };
        info!("正在关闭浏览器...");

        if let Err(e) = browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }

        let task = self
            .handler_task
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(task) = task {
            task.abort();
        }
        info!("✅ 浏览器已关闭");
    }
}

#[async_trait]
impl PageFactory for BrowserHandle {
    async fn open_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        let guard = self.browser.read().await;
        let browser = guard.as_ref().ok_or(RenderError::BrowserClosed)?;
        let page = browser.new_page("about:blank").await.map_err(|e| {
            error!("创建页面失败: {}", e);
            RenderError::page_creation(e)
        })?;
        Ok(Box::new(ChromePage::new(page)))
    }
}
