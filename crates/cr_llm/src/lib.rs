//! # cr_llm - ConvoRelay Session Core
//!
//! 多凭证会话管理：凭证池轮转、对话日志、限流识别与切换、回复清洗。

pub mod classify;
pub mod conversation;
pub mod credential_pool;
pub mod exchange;
pub mod prompt_ast;
pub mod provider;
pub mod retry;
pub mod sanitize;
pub mod session;

pub use classify::{classify_error, classify_message, FailureClass};
pub use conversation::{ContextWindow, ConversationLog};
pub use credential_pool::{Credential, CredentialPool, SharedCredentialPool};
pub use exchange::{ExchangeConfig, ExchangeResult, ExchangeState, SessionContext};
pub use prompt_ast::{PromptAst, PromptNode};
pub use retry::RetryPolicy;
pub use sanitize::sanitize;
pub use session::{RawResponse, SessionFactory, SessionHandle, TokenUsage};

pub use cr_core::{ConvoRelayError, Result, Role, Turn};
