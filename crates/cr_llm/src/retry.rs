//! 有界重试策略
//!
//! 只有限流失败会触发重试，且每个用户轮次至多自动重试一次。
//! 限流后无论是否重试都会先轮转凭证，并在新凭证上重建会话；重试从不复用
//! 已被限流的句柄。

use crate::classify::FailureClass;

/// 单个用户轮次的尝试上限
const MAX_ATTEMPTS_CAP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    /// 限流后在新凭证上透明重试一次
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS_CAP,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` 被夹在 `1..=2`
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS_CAP),
        }
    }

    /// 不重试，限流时直接向用户提示
    pub fn surface_notice() -> Self {
        Self::new(1)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 `attempt` 次（从 1 计）失败后是否再试
    pub fn should_retry(&self, attempt: u32, failure: &FailureClass) -> bool {
        failure.is_rate_limited() && attempt < self.max_attempts
    }
}
