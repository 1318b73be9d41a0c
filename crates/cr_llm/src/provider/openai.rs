//! OpenAI 兼容 Provider
//!
//! 代理上游与直连会话共用同一个 `chat/completions` 调用。返回值保持提供商形状
//! （`choices[0].message` 对象），由调用方决定如何取文本。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credential_pool::Credential;
use crate::provider::relay::extract_output_text;
use crate::provider::{http_failure, transport_failure, validate_credential};
use crate::session::{compose_ast, RawResponse, SessionFactory, SessionHandle, TokenUsage};
use crate::{ConvoRelayError, Result, Turn};

const PROVIDER: &str = "openai";

/// OpenAI 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-nano".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// 一次调用的提供商形状结果
#[derive(Debug, Clone)]
pub struct ProviderOutput {
    pub output: Value,
    pub usage: Option<TokenUsage>,
}

/// OpenAI Provider
#[derive(Clone)]
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn default_provider() -> Self {
        Self::new(OpenAIConfig::default())
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// 将 messages 编译为 OpenAI 兼容请求体
    pub fn compile_request(&self, messages: &[Value]) -> Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": messages,
        })
    }

    /// 单次往返，不重试
    pub async fn run(&self, api_key: &str, messages: &[Value]) -> Result<ProviderOutput> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = self.compile_request(messages);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        let status = resp.status();
        let raw_text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(http_failure(PROVIDER, status, &raw_text));
        }

        let json: Value = serde_json::from_str(&raw_text).map_err(|e| {
            ConvoRelayError::Provider(format!("{PROVIDER}: decode response failed: {e}"))
        })?;

        let output = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .cloned()
            .ok_or_else(|| {
                ConvoRelayError::Provider(format!("{PROVIDER}: unexpected response format"))
            })?;

        let usage = json.get("usage").map(|u| {
            let field = |name: &str| u.get(name).and_then(Value::as_u64).unwrap_or(0);
            TokenUsage {
                prompt_tokens: field("prompt_tokens"),
                output_tokens: field("completion_tokens"),
                total_tokens: field("total_tokens"),
            }
        });

        Ok(ProviderOutput { output, usage })
    }
}

/// 直连 OpenAI 兼容端点的会话工厂
pub struct OpenAISessionFactory {
    provider: OpenAIProvider,
}

impl OpenAISessionFactory {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            provider: OpenAIProvider::new(config),
        }
    }
}

impl SessionFactory for OpenAISessionFactory {
    fn create_session(
        &self,
        credential: &Credential,
        system_instruction: &str,
    ) -> Result<Box<dyn SessionHandle>> {
        validate_credential(PROVIDER, credential)?;
        Ok(Box::new(OpenAISession {
            provider: self.provider.clone(),
            api_key: credential.value().to_string(),
            system_instruction: system_instruction.to_string(),
        }))
    }
}

pub struct OpenAISession {
    provider: OpenAIProvider,
    api_key: String,
    system_instruction: String,
}

#[async_trait]
impl SessionHandle for OpenAISession {
    async fn send(&self, history: &[Turn], prompt: &str) -> Result<RawResponse> {
        let messages = compose_ast(&self.system_instruction, history, prompt).to_openai_messages();
        let out = self.provider.run(&self.api_key, &messages).await?;
        Ok(RawResponse {
            text: extract_output_text(&out.output).unwrap_or_default(),
            usage: out.usage,
        })
    }
}
