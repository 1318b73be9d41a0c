//! 失败分类：限流 / 其他
//!
//! 规则：消息含 "429"，或含 "rate"（区分大小写），或不区分大小写含
//! "too many requests"，即视为限流。其余一律为普通提供商失败。

use crate::ConvoRelayError;

/// 一次失败的分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited(String),
    Provider(String),
}

impl FailureClass {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FailureClass::RateLimited(_))
    }

    pub fn message(&self) -> &str {
        match self {
            FailureClass::RateLimited(m) | FailureClass::Provider(m) => m,
        }
    }
}

/// 按消息文本分类
pub fn classify_message(message: &str) -> FailureClass {
    let limited = message.contains("429")
        || message.contains("rate")
        || message.to_lowercase().contains("too many requests");

    if limited {
        FailureClass::RateLimited(message.to_string())
    } else {
        FailureClass::Provider(message.to_string())
    }
}

/// 按错误分类；提供商已明确标记为限流的直接归类
pub fn classify_error(err: &ConvoRelayError) -> FailureClass {
    match err {
        ConvoRelayError::RateLimited(m) => FailureClass::RateLimited(m.clone()),
        other => classify_message(&other.to_string()),
    }
}
