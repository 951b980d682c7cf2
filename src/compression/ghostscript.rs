//! Ghostscript 压缩器
//!
//! 用 pdfwrite 设备重新编码 PDF：图片降采样、JPEG 重压缩、去重、字体子集化。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::process::spawn_piped;
use super::{clamp_quality, clamp_resolution, Compressor};
use crate::config::Config;
use crate::error::CompressionError;

/// 基于 Ghostscript 子进程的压缩器
#[derive(Clone)]
pub struct GhostscriptCompressor {
    program: String,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl GhostscriptCompressor {
    pub fn new(program: impl Into<String>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            program: program.into(),
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.ghostscript_binary.clone(),
            config.compression_timeout(),
            config.max_concurrent_compressions,
        )
    }
}

#[async_trait]
impl Compressor for GhostscriptCompressor {
    async fn compress(
        &self,
        pdf: Bytes,
        resolution: i64,
        quality: i64,
    ) -> Result<Vec<u8>, CompressionError> {
        let resolution = clamp_resolution(resolution);
        let quality = clamp_quality(quality);
        let args = ghostscript_args(resolution, quality);

        // 信号量不会被关闭
        let _permit = self.permits.acquire().await.ok();

        let start = Instant::now();
        let input_len = pdf.len();
        debug!("Ghostscript 参数: {:?}", args);
        let output = spawn_piped(&self.program, &args, pdf, self.timeout).await?;

        info!(
            "🗜️ 压缩完成: {} → {} 字节 (dpi {}, quality {}, 耗时 {}ms)",
            input_len,
            output.len(),
            resolution,
            quality,
            start.elapsed().as_millis()
        );
        Ok(output)
    }
}

/// 构造 Ghostscript 参数
///
/// 输入从 stdin 读取，输出写到 stdout。
pub fn ghostscript_args(resolution: u32, quality: u32) -> Vec<String> {
    let mut args: Vec<String> = [
        "-q",
        "-dSAFER",
        "-dNOPAUSE",
        "-dBATCH",
        "-sDEVICE=pdfwrite",
        "-dCompatibilityLevel=1.4",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for kind in ["Color", "Gray", "Mono"] {
        args.push(format!("-dDownsample{kind}Images=true"));
        args.push(format!("-d{kind}ImageDownsampleType=/Bicubic"));
        args.push(format!("-d{kind}ImageResolution={resolution}"));
    }

    // 单色图不能用 DCT 编码
    for kind in ["Color", "Gray"] {
        args.push(format!("-dAutoFilter{kind}Images=false"));
        args.push(format!("-d{kind}ImageFilter=/DCTEncode"));
    }
    args.push(format!("-dJPEGQ={quality}"));

    args.extend(
        [
            "-dDetectDuplicateImages=true",
            "-dEmbedAllFonts=true",
            "-dSubsetFonts=true",
            "-sOutputFile=-",
            "-",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args
}
