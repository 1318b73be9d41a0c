//! # cr_proxy - ConvoRelay Proxy
//!
//! 单路由 HTTP 代理：接收 `{ messages }`，以服务端持有（或请求携带）的凭证
//! 转发给模型提供商，返回 `{ output }` 或 `{ error }`。

pub mod error;
pub mod messages;
pub mod server;

pub use error::ApiError;
pub use messages::parse_chat_request;
pub use server::{build_router, ProxyConfig, ProxyServer, ProxyState};
