//! 浏览器层
//!
//! - `headless` - 持有唯一的浏览器进程，负责启动和关闭
//! - `page` - 单个页面的渲染操作
//! - `intercept` - 请求拦截规则的纯函数判断

pub mod headless;
pub mod intercept;
pub mod page;

pub use headless::BrowserHandle;
pub use intercept::{InterceptDecision, InterceptRule};
pub use page::{ChromePage, PageFactory, RenderPage};
