//! 请求上下文中间件
//!
//! 在任何 handler 之前分配关联 ID，并记录请求的接收与完成。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// 单个请求的上下文
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// 仅用于日志关联，不能当作幂等键或安全令牌
    pub correlation_id: String,
    pub received_at: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            correlation_id: new_correlation_id(),
            received_at: Instant::now(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 亚秒时钟 + 进程内序号 + 6 位随机串
pub fn new_correlation_id() -> String {
    let micros = chrono::Utc::now().timestamp_subsec_micros();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let token = Uuid::new_v4().simple().to_string();
    format!("{:06}-{}-{}", micros, sequence, &token[..6])
}

pub async fn assign_correlation_id(mut request: Request, next: Next) -> Response {
    let ctx = RequestContext::new();
    let span = info_span!("request", correlation_id = %ctx.correlation_id);

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    request.extensions_mut().insert(ctx.clone());

    async move {
        info!(method = %method, path = %path, "📥 收到请求");
        let response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = ctx.received_at.elapsed().as_millis() as u64,
            "📤 请求完成"
        );
        response
    }
    .instrument(span)
    .await
}
