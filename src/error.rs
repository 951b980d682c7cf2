use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求参数校验失败
    #[error("参数错误: {0}")]
    Validation(#[from] ValidationError),
    /// 渲染相关错误
    #[error("渲染错误: {0}")]
    Render(#[from] RenderError),
    /// 压缩相关错误
    #[error("压缩错误: {0}")]
    Compression(#[from] CompressionError),
}

/// 请求参数校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// 缺少必填字段
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    /// 请求体为空
    #[error("request body is empty")]
    EmptyBody,
    /// 请求格式无法解析
    #[error("malformed request: {message}")]
    Malformed { message: String },
    /// 上传的内容类型不是 PDF
    #[error("unsupported content type `{content_type}`")]
    UnsupportedContentType { content_type: String },
}

/// 浏览器 / 渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 启动浏览器失败
    #[error("failed to launch browser: {message}")]
    LaunchFailed { message: String },
    /// 浏览器已关闭
    #[error("browser has been shut down")]
    BrowserClosed,
    /// 创建页面失败
    #[error("failed to open page: {message}")]
    PageCreationFailed { message: String },
    /// 页面配置失败（cookie / 拦截）
    #[error("failed to configure page: {message}")]
    PageSetupFailed { message: String },
    /// 导航失败
    #[error("navigation to {url} failed: {message}")]
    NavigationFailed { url: String, message: String },
    /// 等待选择器超时
    #[error("selector `{selector}` did not appear within {timeout_ms}ms")]
    SelectorTimeout { selector: String, timeout_ms: u64 },
    /// 某个阶段超时
    #[error("{phase} timed out after {timeout_ms}ms")]
    Timeout { phase: &'static str, timeout_ms: u64 },
    /// 生成 PDF 失败
    #[error("failed to print pdf: {message}")]
    PrintFailed { message: String },
    /// 渲染后压缩失败
    #[error("compression after render failed: {0}")]
    Compression(#[from] CompressionError),
}

/// 压缩子进程错误
#[derive(Debug, Error)]
pub enum CompressionError {
    /// 无法启动子进程（程序不存在或不可执行）
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 子进程非零退出
    #[error("`{program}` exited with code {code:?}")]
    ExitStatus { program: String, code: Option<i32> },
    /// 管道读写失败
    #[error("i/o error while talking to `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 子进程超时
    #[error("`{program}` did not finish within {timeout_secs}s")]
    Timeout { program: String, timeout_secs: u64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("failed to parse config file {path}: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl RenderError {
    pub fn page_creation(source: impl std::fmt::Display) -> Self {
        RenderError::PageCreationFailed {
            message: source.to_string(),
        }
    }

    pub fn page_setup(source: impl std::fmt::Display) -> Self {
        RenderError::PageSetupFailed {
            message: source.to_string(),
        }
    }

    pub fn navigation(url: impl Into<String>, source: impl std::fmt::Display) -> Self {
        RenderError::NavigationFailed {
            url: url.into(),
            message: source.to_string(),
        }
    }

    pub fn print(source: impl std::fmt::Display) -> Self {
        RenderError::PrintFailed {
            message: source.to_string(),
        }
    }
}

impl AppError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Render(_) | AppError::Compression(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给调用方的通用消息，不包含内部细节
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::Validation(ValidationError::MissingField { .. }) => "url is required",
            AppError::Validation(ValidationError::EmptyBody) => "request body is empty",
            AppError::Validation(ValidationError::Malformed { .. }) => "malformed request",
            AppError::Validation(ValidationError::UnsupportedContentType { .. }) => {
                "Content-Type must be application/pdf"
            }
            AppError::Render(_) => "Error generating PDF",
            AppError::Compression(_) => "Error compressing PDF",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "请求处理失败");
        } else {
            warn!(error = %self, "请求被拒绝");
        }
        (status, self.public_message()).into_response()
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
