//! 请求体解析
//!
//! 数值字段兼容数字和数字字符串，无法解析时使用默认值。

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::browser::InterceptRule;
use crate::compression::CompressionSettings;
use crate::error::ValidationError;
use crate::models::{CookieSpec, RenderRequest};

/// `POST /generateReport` 请求体
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportBody {
    pub url: Option<String>,
    #[serde(default)]
    pub intercept: Option<Vec<InterceptRule>>,
    #[serde(default)]
    pub cookies: Option<Vec<CookieSpec>>,
    #[serde(default)]
    pub wait_for_selector: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub compression: bool,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub dpi: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub quality: Option<i64>,
    /// 毫秒
    #[serde(default, deserialize_with = "lenient_i64")]
    pub timeout: Option<i64>,
}

impl GenerateReportBody {
    /// 校验并转换为渲染请求，超时不超过 `max_timeout`
    pub fn into_render_request(
        self,
        default_timeout: Duration,
        max_timeout: Duration,
    ) -> Result<RenderRequest, ValidationError> {
        let url = required_url(self.url.as_deref())?;

        let timeout = self
            .timeout
            .filter(|ms| *ms > 0)
            .map_or(default_timeout, |ms| Duration::from_millis(ms as u64))
            .min(max_timeout);

        let mut request = RenderRequest::new(url)
            .with_timeout(timeout)
            .with_intercept(self.intercept.unwrap_or_default())
            .with_cookies(self.cookies.unwrap_or_default())
            .with_compression(CompressionSettings::new(
                self.compression,
                self.dpi,
                self.quality,
            ));
        if let Some(selector) = self.wait_for_selector {
            request = request.with_wait_for_selector(selector);
        }
        Ok(request)
    }
}

/// `url` 必填且不能为空白
pub fn required_url(url: Option<&str>) -> Result<String, ValidationError> {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => Ok(url.to_string()),
        _ => Err(ValidationError::MissingField { field: "url" }),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Bool(b)) => b,
        Some(JsonValue::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(JsonValue::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}
