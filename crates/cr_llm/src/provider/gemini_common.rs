//! Gemini 请求编译与响应解析
//!
//! - `compile_gemini_request`: 将 PromptAst 编译为 Gemini JSON 请求体
//! - `parse_gemini_response`: 解析非流式响应文本与 usageMetadata

use serde_json::Value;

use crate::prompt_ast::{PromptAst, PromptNode};
use crate::session::{RawResponse, TokenUsage};
use crate::{ConvoRelayError, Result};

/// 将 PromptAst 编译为 Gemini JSON 请求体
///
/// Gemini native 格式：
/// - role: "user" | "model"（不用 "assistant"）
/// - parts: [{ "text": "..." }]
/// - systemInstruction: { "parts": [...] }
pub fn compile_gemini_request(ast: &PromptAst) -> Value {
    let mut system_parts: Vec<Value> = Vec::new();
    let mut contents: Vec<Value> = Vec::new();

    for node in ast.nodes() {
        match node {
            PromptNode::System(text) => {
                if !text.is_empty() {
                    system_parts.push(serde_json::json!({ "text": text }));
                }
            }
            PromptNode::Assistant(text) => {
                contents.push(serde_json::json!({
                    "role": "model",
                    "parts": [{ "text": text }]
                }));
            }
            PromptNode::User(text) => {
                contents.push(serde_json::json!({
                    "role": "user",
                    "parts": [{ "text": text }]
                }));
            }
        }
    }

    let mut body = serde_json::json!({ "contents": contents });

    if !system_parts.is_empty() {
        body["systemInstruction"] = serde_json::json!({ "parts": system_parts });
    }

    body
}

fn parse_usage(json: &Value) -> Option<TokenUsage> {
    let meta = json.get("usageMetadata")?;
    let field = |name: &str| meta.get(name).and_then(Value::as_u64).unwrap_or(0);

    let prompt_tokens = field("promptTokenCount");
    let output_tokens = field("candidatesTokenCount");
    let total_tokens = match field("totalTokenCount") {
        0 => prompt_tokens + output_tokens,
        n => n,
    };
    Some(TokenUsage {
        prompt_tokens,
        output_tokens,
        total_tokens,
    })
}

/// 解析响应：拼接 candidates[0].content.parts[*].text
pub fn parse_gemini_response(raw: &str) -> Result<RawResponse> {
    let json: Value = serde_json::from_str(raw).map_err(|e| {
        ConvoRelayError::Provider(format!("gemini: decode response failed: {e}"))
    })?;

    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ConvoRelayError::Provider("gemini: unexpected response format".to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    Ok(RawResponse {
        text,
        usage: parse_usage(&json),
    })
}
