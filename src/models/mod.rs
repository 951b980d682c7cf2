pub mod cookie;
pub mod render_request;

pub use cookie::{CookieSpec, SameSite};
pub use render_request::{
    normalize_url, RenderRequest, DEFAULT_MAX_RENDER_TIMEOUT, DEFAULT_RENDER_TIMEOUT,
};
