//! # ev_web_pdf
//!
//! 把网页渲染成 PDF，并可以用 Ghostscript 压缩 PDF 的 HTTP 服务
//!
//! ## 架构设计
//!
//! ### ① 基础设施层
//! - `browser/` - 持有唯一的浏览器进程，每个请求打开自己的页面
//! - `compression/` - 通过子进程调用 Ghostscript
//!
//! ### ② 业务能力层
//! - `services/` - `RenderService`：页面配置 → 导航 → 打印 →（可选）压缩
//!
//! ### ③ 接入层
//! - `http/` - 路由、参数校验、关联 ID
//! - `server` - 连接循环，keep-alive 和优雅退出
//!
//! ### ④ 编排层
//! - `app` - 启动和关闭顺序
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod compression;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use browser::{BrowserHandle, InterceptRule, PageFactory, RenderPage};
pub use compression::{CompressionSettings, Compressor, GhostscriptCompressor};
pub use config::Config;
pub use error::{AppError, AppResult, CompressionError, RenderError, ValidationError};
pub use models::{CookieSpec, RenderRequest};
pub use services::RenderService;
