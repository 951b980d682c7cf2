/// 日志工具模块
///
/// 提供日志初始化、阶段计时和输出的辅助函数
use std::time::Instant;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

/// 初始化全局日志
///
/// `RUST_LOG` 优先于配置中的过滤规则；配置了遥测连接串时输出 JSON，
/// 交给外部采集管道处理。
pub fn init(config: &Config) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.telemetry_connection_string.is_some() {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().compact().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("初始化日志失败: {}", e))
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 网页转 PDF 服务");
    info!("🌐 监听地址: {}", config.listen_addr());
    info!("📄 页面并发上限: {}", config.max_concurrent_pages);
    info!("🗜️ 压缩并发上限: {}", config.max_concurrent_compressions);
    if config.telemetry_connection_string.is_some() {
        info!("📡 已配置遥测连接串，日志以 JSON 输出");
    }
    info!("{}", "=".repeat(60));
}

/// 记录带耗时的阶段日志
///
/// # 参数
/// - `message`: 阶段描述
/// - `start`: 计时起点
/// - `correlation_id`: 请求关联 ID
///
/// 返回记录的耗时（毫秒）
pub fn trace_phase(message: &str, start: Instant, correlation_id: &str) -> u64 {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        correlation_id = correlation_id,
        elapsed_ms = elapsed_ms,
        "{}",
        message
    );
    elapsed_ms
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("abc", 3), "abc");
        assert_eq!(truncate_text("字体子集化", 2), "字体...");
    }

    #[test]
    fn test_trace_phase_measures_from_marker() {
        let received_at = Instant::now()
            .checked_sub(std::time::Duration::from_millis(50))
            .unwrap();
        assert!(trace_phase("开始渲染", received_at, "cid") >= 50);
    }
}
