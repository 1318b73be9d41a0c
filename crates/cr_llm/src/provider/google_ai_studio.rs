//! Google AI Studio Provider 实现
//!
//! 通过 API Key 访问 Google AI Studio (generativelanguage.googleapis.com)
//!
//! URL 格式: `{base}/v1beta/models/{model}:generateContent`
//! 认证方式: `x-goog-api-key` header

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credential_pool::Credential;
use crate::provider::gemini_common::{compile_gemini_request, parse_gemini_response};
use crate::provider::{http_failure, transport_failure, validate_credential};
use crate::session::{compose_ast, RawResponse, SessionFactory, SessionHandle};
use crate::{Result, Turn};

// ── 常量 ────────────────────────────────────────────────────────────────────────
const GOOGLE_AI_STUDIO_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GOOGLE_AI_STUDIO_API_VERSION: &str = "v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
const PROVIDER: &str = "gemini";

// ── 数据结构 ────────────────────────────────────────────────────────────────────
/// Google AI Studio 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// 模型，如 "gemini-2.5-flash", "gemini-2.5-pro"
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: GOOGLE_AI_STUDIO_BASE_URL.to_string(),
        }
    }
}

/// 为每个凭证生成 Gemini 会话；HTTP 连接池在所有会话间共享
pub struct GeminiSessionFactory {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiSessionFactory {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

impl SessionFactory for GeminiSessionFactory {
    fn create_session(
        &self,
        credential: &Credential,
        system_instruction: &str,
    ) -> Result<Box<dyn SessionHandle>> {
        validate_credential(PROVIDER, credential)?;
        tracing::debug!(credential = %credential.masked(), model = %self.config.model, "gemini session created");

        Ok(Box::new(GeminiSession {
            api_key: credential.value().to_string(),
            url: build_url(&self.config, "generateContent"),
            system_instruction: system_instruction.to_string(),
            client: self.client.clone(),
        }))
    }
}

/// 绑定单个 API Key 的 Gemini 会话
pub struct GeminiSession {
    api_key: String,
    url: String,
    system_instruction: String,
    client: reqwest::Client,
}

/// 构造 API URL
fn build_url(config: &GeminiConfig, action: &str) -> String {
    format!(
        "{}/{}/models/{}:{}",
        config.base_url.trim_end_matches('/'),
        GOOGLE_AI_STUDIO_API_VERSION,
        config.model,
        action
    )
}

#[async_trait]
impl SessionHandle for GeminiSession {
    async fn send(&self, history: &[Turn], prompt: &str) -> Result<RawResponse> {
        let ast = compose_ast(&self.system_instruction, history, prompt);
        let body = compile_gemini_request(&ast);

        let resp = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        let status = resp.status();
        let raw_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(http_failure(PROVIDER, status, &raw_text));
        }

        parse_gemini_response(&raw_text)
    }
}
