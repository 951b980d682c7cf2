//! HTTP 服务循环
//!
//! axum 路由跑在 hyper-util 的连接构建器上，以便设置固定的 keep-alive 空闲超时。

use std::future::Future;
use std::time::Duration;

use axum::extract::Request;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tower::Service;
use tracing::{debug, info, warn};

use crate::config::KEEP_ALIVE_TIMEOUT;

/// 停止接受连接后等待在途请求的最长时间
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// 接受连接直到 `shutdown` 完成，然后等待在途连接结束
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("接受连接失败: {}", e);
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let service = router.clone();
        connections.spawn(async move {
            let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
                service.clone().call(request)
            });

            let mut builder = Builder::new(TokioExecutor::new());
            builder
                .http1()
                .timer(TokioTimer::new())
                .keep_alive(true)
                .header_read_timeout(KEEP_ALIVE_TIMEOUT);

            if let Err(e) = builder
                .serve_connection(TokioIo::new(stream), hyper_service)
                .await
            {
                debug!("连接 {} 结束: {}", remote, e);
            }
        });

        // 回收已结束的连接
        while connections.try_join_next().is_some() {}
    }

    info!("停止接受新连接，等待 {} 个在途连接...", connections.len());
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("仍有 {} 个连接未结束，强制关闭", connections.len());
        connections.abort_all();
    }
    Ok(())
}
