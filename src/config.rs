use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// HTTP keep-alive 空闲超时（固定 60 秒）
pub const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "EV_WEB_PDF_CONFIG";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 监听地址
    pub host: IpAddr,
    /// 监听端口
    pub port: u16,
    /// 浏览器可执行文件路径，为空时自动探测
    pub chrome_executable: Option<String>,
    /// Ghostscript 可执行文件
    pub ghostscript_binary: String,
    /// 默认渲染超时（毫秒）
    pub render_timeout_ms: u64,
    /// 单个请求可申请的最长渲染超时（毫秒），也是浏览器 CDP 命令的超时
    pub max_render_timeout_ms: u64,
    /// 同时打开的页面上限
    pub max_concurrent_pages: usize,
    /// 同时运行的压缩子进程上限
    pub max_concurrent_compressions: usize,
    /// 压缩子进程超时（秒）
    pub compression_timeout_secs: u64,
    /// 请求体大小上限（字节）
    pub max_body_bytes: usize,
    /// 日志过滤规则（RUST_LOG 优先）
    pub log_filter: String,
    /// 外部遥测连接串，设置后日志输出为 JSON
    pub telemetry_connection_string: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            chrome_executable: None,
            ghostscript_binary: "gs".to_string(),
            render_timeout_ms: 70_000,
            max_render_timeout_ms: 300_000,
            max_concurrent_pages: 16,
            max_concurrent_compressions: 8,
            compression_timeout_secs: 120,
            max_body_bytes: 100 * 1024 * 1024,
            log_filter: "info".to_string(),
            telemetry_connection_string: None,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// 仅从环境变量加载
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: display.clone(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::ParseFailed {
            path: display,
            source,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// 用环境变量覆盖字段；无法解析的值保持原值
    pub fn with_env_overrides<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            host: parse_or(text("HOST"), self.host),
            port: parse_or(text("PORT"), self.port),
            chrome_executable: text("CHROME_EXECUTABLE").or(self.chrome_executable),
            ghostscript_binary: text("GHOSTSCRIPT_BINARY").unwrap_or(self.ghostscript_binary),
            render_timeout_ms: parse_or(text("RENDER_TIMEOUT_MS"), self.render_timeout_ms),
            max_render_timeout_ms: parse_or(
                text("MAX_RENDER_TIMEOUT_MS"),
                self.max_render_timeout_ms,
            ),
            max_concurrent_pages: parse_or(text("MAX_CONCURRENT_PAGES"), self.max_concurrent_pages),
            max_concurrent_compressions: parse_or(
                text("MAX_CONCURRENT_COMPRESSIONS"),
                self.max_concurrent_compressions,
            ),
            compression_timeout_secs: parse_or(
                text("COMPRESSION_TIMEOUT_SECS"),
                self.compression_timeout_secs,
            ),
            max_body_bytes: parse_or(text("MAX_BODY_BYTES"), self.max_body_bytes),
            log_filter: text("RUST_LOG").unwrap_or(self.log_filter),
            telemetry_connection_string: text("APPLICATIONINSIGHTS_CONNECTION_STRING")
                .or(self.telemetry_connection_string),
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// 请求超时上限，不小于默认渲染超时
    pub fn max_render_timeout(&self) -> Duration {
        Duration::from_millis(self.max_render_timeout_ms.max(self.render_timeout_ms))
    }

    pub fn compression_timeout(&self) -> Duration {
        Duration::from_secs(self.compression_timeout_secs)
    }
}

/// 解析失败时保留原值
fn parse_or<T: FromStr>(raw: Option<String>, current: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(current)
}
