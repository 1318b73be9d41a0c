//! LLM Provider 子模块

pub mod gemini_common;
pub mod google_ai_studio;
pub mod openai;
pub mod relay;

pub use google_ai_studio::{GeminiConfig, GeminiSessionFactory};
pub use openai::{OpenAIConfig, OpenAIProvider, OpenAISessionFactory, ProviderOutput};
pub use relay::{extract_output_text, RelaySessionFactory};

use reqwest::StatusCode;

use crate::credential_pool::Credential;
use crate::{ConvoRelayError, Result};

/// 凭证必须能作为 HTTP 头值发送
pub(crate) fn validate_credential(provider: &str, credential: &Credential) -> Result<()> {
    let value = credential.value();
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConvoRelayError::Configuration(format!(
            "{provider}: malformed credential {}",
            credential.masked()
        )));
    }
    Ok(())
}

/// 传输层失败；去掉 URL，避免路径中的文字干扰限流判定
pub(crate) fn transport_failure(provider: &str, err: reqwest::Error) -> ConvoRelayError {
    ConvoRelayError::Provider(format!("{provider}: request failed: {}", err.without_url()))
}

/// 非 2xx 响应；429 直接标记为限流
pub(crate) fn http_failure(provider: &str, status: StatusCode, body: &str) -> ConvoRelayError {
    let message = format!("{provider}: HTTP {status}: {}", body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS {
        ConvoRelayError::RateLimited(message)
    } else {
        ConvoRelayError::Provider(message)
    }
}
