#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ev_web_pdf::browser::{InterceptRule, PageFactory, RenderPage};
use ev_web_pdf::error::{CompressionError, RenderError};
use ev_web_pdf::models::CookieSpec;
use ev_web_pdf::Compressor;

pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n% fake page\n%%EOF\n";
pub const FAKE_COMPRESSED: &[u8] = b"%PDF-1.4\n%%EOF\n";

/// 记录页面调用顺序的假浏览器
#[derive(Clone, Default)]
pub struct FakeBrowser {
    pub steps: Arc<Mutex<Vec<String>>>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    /// 当前打开的页面数和历史峰值
    pub open_now: Arc<AtomicUsize>,
    pub peak_open: Arc<AtomicUsize>,
    /// 在该步骤返回错误
    pub fail_at: Option<&'static str>,
    /// 导航耗时
    pub navigate_delay: Option<Duration>,
}

impl FakeBrowser {
    pub fn failing_at(step: &'static str) -> Self {
        Self {
            fail_at: Some(step),
            ..Self::default()
        }
    }

    pub fn with_navigate_delay(delay: Duration) -> Self {
        Self {
            navigate_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFactory for FakeBrowser {
    async fn open_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        if self.fail_at == Some("open") {
            return Err(RenderError::page_creation("browser crashed"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let open = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            browser: self.clone(),
        }))
    }
}

pub struct FakePage {
    browser: FakeBrowser,
}

impl FakePage {
    fn record(&self, step: impl Into<String>) {
        self.browser.steps.lock().unwrap().push(step.into());
    }

    fn check(&self, step: &'static str) -> Result<(), RenderError> {
        if self.browser.fail_at == Some(step) {
            return Err(match step {
                "navigate" => RenderError::Timeout {
                    phase: "navigation",
                    timeout_ms: 1,
                },
                "selector" => RenderError::SelectorTimeout {
                    selector: "body".to_string(),
                    timeout_ms: 1,
                },
                "pdf" => RenderError::print("target crashed"),
                other => RenderError::page_setup(other),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RenderPage for FakePage {
    async fn set_cookies(
        &mut self,
        cookies: &[CookieSpec],
        target_url: &str,
    ) -> Result<(), RenderError> {
        self.record(format!("cookies:{}@{}", cookies.len(), target_url));
        self.check("cookies")
    }

    async fn enable_interception(&mut self, rules: Vec<InterceptRule>) -> Result<(), RenderError> {
        self.record(format!("intercept:{}", rules.len()));
        self.check("intercept")
    }

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), RenderError> {
        self.record(format!("navigate:{}", url));
        if let Some(delay) = self.browser.navigate_delay {
            tokio::time::sleep(delay).await;
        }
        self.check("navigate")
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), RenderError> {
        self.record(format!("selector:{}", selector));
        self.check("selector")
    }

    async fn print_pdf(&mut self, _timeout: Duration) -> Result<Vec<u8>, RenderError> {
        self.record("pdf");
        self.check("pdf")?;
        Ok(FAKE_PDF.to_vec())
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.record("close");
        self.browser.closed.fetch_add(1, Ordering::SeqCst);
        self.browser.open_now.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 记录调用参数的假压缩器
#[derive(Clone, Default)]
pub struct FakeCompressor {
    pub calls: Arc<Mutex<Vec<(usize, i64, i64)>>>,
    /// 模拟子进程退出码
    pub exit_code: Option<i32>,
}

impl FakeCompressor {
    pub fn failing_with(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(usize, i64, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Compressor for FakeCompressor {
    async fn compress(
        &self,
        pdf: Bytes,
        resolution: i64,
        quality: i64,
    ) -> Result<Vec<u8>, CompressionError> {
        self.calls
            .lock()
            .unwrap()
            .push((pdf.len(), resolution, quality));
        match self.exit_code {
            Some(code) => Err(CompressionError::ExitStatus {
                program: "gs".to_string(),
                code: Some(code),
            }),
            None => Ok(FAKE_COMPRESSED.to_vec()),
        }
    }
}
