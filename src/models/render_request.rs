//! 渲染请求

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::browser::intercept::InterceptRule;
use crate::compression::CompressionSettings;
use crate::models::cookie::CookieSpec;

/// 默认渲染超时
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_millis(70_000);

/// 单个请求可申请的最长超时
pub const DEFAULT_MAX_RENDER_TIMEOUT: Duration = Duration::from_millis(300_000);

/// 默认等待的选择器
pub const DEFAULT_WAIT_SELECTOR: &str = "body";

static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("scheme pattern is valid")
});

/// 一次渲染所需的全部参数，单次使用
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub url: String,
    pub timeout: Duration,
    pub intercept: Vec<InterceptRule>,
    pub cookies: Vec<CookieSpec>,
    pub wait_for_selector: String,
    pub compression: CompressionSettings,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_RENDER_TIMEOUT,
            intercept: Vec::new(),
            cookies: Vec::new(),
            wait_for_selector: DEFAULT_WAIT_SELECTOR.to_string(),
            compression: CompressionSettings::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_intercept(mut self, rules: Vec<InterceptRule>) -> Self {
        self.intercept = rules;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<CookieSpec>) -> Self {
        self.cookies = cookies;
        self
    }

    /// 空白选择器保持默认值
    pub fn with_wait_for_selector(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        if !selector.trim().is_empty() {
            self.wait_for_selector = selector;
        }
        self
    }

    pub fn with_compression(mut self, settings: CompressionSettings) -> Self {
        self.compression = settings;
        self
    }

    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }
}

/// 没有协议前缀的 URL 补上 `http://`
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if SCHEME.is_match(url) {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}
