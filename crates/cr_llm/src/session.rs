//! 模型会话工厂与会话句柄
//!
//! 句柄绑定一个凭证与一份系统指令。轮转凭证后必须经工厂重建句柄，
//! 句柄从不跨越轮转边界复用。句柄内部不做重试，重试策略归编排层。

use async_trait::async_trait;

use crate::credential_pool::Credential;
use crate::prompt_ast::{PromptAst, PromptNode};
use crate::{Result, Turn};

/// 单次请求的 token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// 模型原始回复
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl RawResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// 绑定到单个凭证的会话
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// 一次网络往返。`history` 不含 `prompt`，`prompt` 是最后一个用户轮次。
    async fn send(&self, history: &[Turn], prompt: &str) -> Result<RawResponse>;
}

/// 会话工厂；凭证非法或初始化被拒时立即返回 `Configuration` 错误
pub trait SessionFactory: Send + Sync {
    fn create_session(
        &self,
        credential: &Credential,
        system_instruction: &str,
    ) -> Result<Box<dyn SessionHandle>>;
}

/// 系统指令 + 历史 + 当前输入
pub fn compose_ast(system_instruction: &str, history: &[Turn], prompt: &str) -> PromptAst {
    PromptAst::from_context(system_instruction, history).push(PromptNode::User(prompt.to_string()))
}
