//! 子进程管道调用
//!
//! 把一段字节写入子进程 stdin，同时收集 stdout，只在退出码为 0 时返回结果。

use std::io;
use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CompressionError;
use crate::utils::truncate_text;

/// stderr 日志最多保留的字符数
const STDERR_LOG_LIMIT: usize = 2000;

/// 启动子进程，写入 `input`，返回完整 stdout
///
/// stderr 只记录日志，不影响结果；超时后子进程会被杀掉。
pub async fn spawn_piped(
    program: &str,
    args: &[String],
    input: Bytes,
    timeout: Duration,
) -> Result<Vec<u8>, CompressionError> {
    debug!("启动子进程: {} ({} 个参数, 输入 {} 字节)", program, args.len(), input.len());

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CompressionError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let io_error = |source: io::Error| CompressionError::Io {
        program: program.to_string(),
        source,
    };
    let missing_pipe = || io_error(io::Error::new(io::ErrorKind::BrokenPipe, "pipe not captured"));

    let mut stdin = child.stdin.take().ok_or_else(missing_pipe)?;
    let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
    let stderr = child.stderr.take().ok_or_else(missing_pipe)?;

    let write_input = async move {
        stdin.write_all(&input).await?;
        // 关闭 stdin 通知子进程输入结束
        stdin.shutdown().await
    };

    let outcome = tokio::time::timeout(timeout, async {
        let (written, output, diagnostics) =
            tokio::join!(write_input, read_all(stdout), read_all(stderr));
        let status = child.wait().await;
        (written, output, diagnostics, status)
    })
    .await;

    let (written, output, diagnostics, status) = match outcome {
        Ok(parts) => parts,
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("结束超时子进程失败: {}", e);
            }
            return Err(CompressionError::Timeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    if let Ok(text) = &diagnostics {
        let text = String::from_utf8_lossy(text);
        if !text.trim().is_empty() {
            warn!("{} stderr: {}", program, truncate_text(text.trim(), STDERR_LOG_LIMIT));
        }
    }

    let status = status.map_err(io_error)?;
    if !status.success() {
        return Err(CompressionError::ExitStatus {
            program: program.to_string(),
            code: status.code(),
        });
    }

    written.map_err(io_error)?;
    let output = output.map_err(io_error)?;
    debug!("子进程完成: {} 输出 {} 字节", program, output.len());
    Ok(output)
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}
