//! PDF 压缩
//!
//! - `process` - 通用的子进程管道调用
//! - `ghostscript` - 基于 Ghostscript 的压缩器

pub mod ghostscript;
pub mod process;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CompressionError;

pub use ghostscript::GhostscriptCompressor;

pub const DEFAULT_RESOLUTION: u32 = 150;
pub const MIN_RESOLUTION: u32 = 10;
pub const MAX_RESOLUTION: u32 = 600;

pub const DEFAULT_QUALITY: u32 = 95;
pub const MIN_QUALITY: u32 = 1;
pub const MAX_QUALITY: u32 = 100;

/// 把分辨率限制在 [10, 600]
pub fn clamp_resolution(dpi: i64) -> u32 {
    dpi.clamp(MIN_RESOLUTION as i64, MAX_RESOLUTION as i64) as u32
}

/// 把图片质量限制在 [1, 100]
pub fn clamp_quality(quality: i64) -> u32 {
    quality.clamp(MIN_QUALITY as i64, MAX_QUALITY as i64) as u32
}

/// 压缩设置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    pub enabled: bool,
    pub resolution: u32,
    pub quality: u32,
}

impl CompressionSettings {
    /// 缺省值取默认，超出范围的值会被截断
    pub fn new(enabled: bool, resolution: Option<i64>, quality: Option<i64>) -> Self {
        Self {
            enabled,
            resolution: resolution.map_or(DEFAULT_RESOLUTION, clamp_resolution),
            quality: quality.map_or(DEFAULT_QUALITY, clamp_quality),
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self::new(false, None, None)
    }
}

/// 压缩能力
///
/// 调用方可以传入任意范围的分辨率和质量，实现负责截断。
#[async_trait]
pub trait Compressor: Send + Sync {
    async fn compress(
        &self,
        pdf: Bytes,
        resolution: i64,
        quality: i64,
    ) -> Result<Vec<u8>, CompressionError>;
}
