//! 全局错误处理机制

use thiserror::Error;

/// ConvoRelay 统一错误类型
#[derive(Error, Debug)]
pub enum ConvoRelayError {
    /// 凭证或指令来源缺失/非法，启动期致命，不重试
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 提供商明确返回的限流
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 模型调用的其他失败
    #[error("LLM provider error: {0}")]
    Provider(String),

    /// 边界层请求校验失败，不会到达模型调用
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 错误分类标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    RateLimited,
    Provider,
    MalformedRequest,
}

impl ConvoRelayError {
    /// 归入四类之一；IO 与序列化错误视为配置错误（只在加载来源时出现）
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvoRelayError::Configuration(_)
            | ConvoRelayError::Io(_)
            | ConvoRelayError::Serialization(_) => ErrorKind::Configuration,
            ConvoRelayError::RateLimited(_) => ErrorKind::RateLimited,
            ConvoRelayError::Provider(_) => ErrorKind::Provider,
            ConvoRelayError::MalformedRequest(_) => ErrorKind::MalformedRequest,
        }
    }
}

/// 统一 Result 类型别名
pub type Result<T> = std::result::Result<T, ConvoRelayError>;
