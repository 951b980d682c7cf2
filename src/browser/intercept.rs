//! 请求拦截规则
//!
//! 判断逻辑与浏览器事件无关，CDP 层只负责把判断结果转成协议命令。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 拦截规则：URL 包含 `match_url` 的请求直接返回 `mock_body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptRule {
    #[serde(rename = "apiUrl")]
    pub match_url: String,
    #[serde(rename = "apiBody", default)]
    pub mock_body: JsonValue,
}

impl InterceptRule {
    pub fn new(match_url: impl Into<String>, mock_body: JsonValue) -> Self {
        Self {
            match_url: match_url.into(),
            mock_body,
        }
    }

    /// 空的匹配串不匹配任何请求，否则会连主文档一起拦截
    pub fn matches(&self, url: &str) -> bool {
        !self.match_url.is_empty() && url.contains(&self.match_url)
    }

    /// 生成模拟响应
    pub fn mock_response(&self) -> MockResponse {
        MockResponse {
            status: 200,
            content_type: "application/json",
            body: self.mock_body.to_string().into_bytes(),
        }
    }
}

/// 模拟响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// 拦截判断结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    /// 直接返回模拟响应，不访问网络
    Fulfill(MockResponse),
    /// 原样放行
    Continue,
}

/// 按顺序匹配规则，第一条命中的规则生效
pub fn decide(url: &str, rules: &[InterceptRule]) -> InterceptDecision {
    rules
        .iter()
        .find(|rule| rule.matches(url))
        .map_or(InterceptDecision::Continue, |rule| {
            InterceptDecision::Fulfill(rule.mock_response())
        })
}
