//! 中继客户端：经 ConvoRelay 代理访问模型
//!
//! 请求体 `{ "messages": [...] }`，系统消息在前；成功返回 `{ "output": ... }`，
//! 失败返回 `{ "error": "..." }`。绑定的凭证以 Bearer 头转交给代理。

use async_trait::async_trait;
use serde_json::Value;

use crate::credential_pool::Credential;
use crate::provider::{http_failure, transport_failure, validate_credential};
use crate::session::{compose_ast, RawResponse, SessionFactory, SessionHandle};
use crate::{ConvoRelayError, Result, Turn};

const PROVIDER: &str = "relay";

/// 嵌套对象的最大展开深度
const MAX_EXTRACT_DEPTH: usize = 4;

/// 从提供商形状的输出中尽量取出文本
///
/// 依次接受：字符串；含 `content` / `text` / `message` 的对象（可嵌套）；
/// 数组中第一个可取出文本的元素。取不到返回 `None`。
pub fn extract_output_text(output: &Value) -> Option<String> {
    extract_at_depth(output, 0)
}

fn extract_at_depth(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_EXTRACT_DEPTH {
        return None;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["content", "text", "message"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|v| extract_at_depth(v, depth + 1)),
        Value::Array(items) => items.iter().find_map(|v| extract_at_depth(v, depth + 1)),
        _ => None,
    }
}

pub struct RelaySessionFactory {
    endpoint: String,
    client: reqwest::Client,
}

impl RelaySessionFactory {
    /// `endpoint` 为代理的完整 `/chat` 地址
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl SessionFactory for RelaySessionFactory {
    fn create_session(
        &self,
        credential: &Credential,
        system_instruction: &str,
    ) -> Result<Box<dyn SessionHandle>> {
        validate_credential(PROVIDER, credential)?;
        Ok(Box::new(RelaySession {
            endpoint: self.endpoint.clone(),
            credential: credential.value().to_string(),
            system_instruction: system_instruction.to_string(),
            client: self.client.clone(),
        }))
    }
}

pub struct RelaySession {
    endpoint: String,
    credential: String,
    system_instruction: String,
    client: reqwest::Client,
}

#[async_trait]
impl SessionHandle for RelaySession {
    async fn send(&self, history: &[Turn], prompt: &str) -> Result<RawResponse> {
        let messages = compose_ast(&self.system_instruction, history, prompt).to_openai_messages();

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.credential)
            .json(&serde_json::json!({ "messages": messages }))
            .send()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        let status = resp.status();
        let raw_text = resp.text().await.unwrap_or_default();
        let json: Option<Value> = serde_json::from_str(&raw_text).ok();

        if !status.is_success() {
            let detail = json
                .as_ref()
                .and_then(|j| j.get("error"))
                .map(|e| match e {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or(raw_text);
            return Err(http_failure(PROVIDER, status, &detail));
        }

        let json = json.ok_or_else(|| {
            ConvoRelayError::Provider(format!("{PROVIDER}: proxy returned a non-JSON body"))
        })?;

        let text = json
            .get("output")
            .and_then(extract_output_text)
            .unwrap_or_default();
        Ok(RawResponse::text(text))
    }
}
