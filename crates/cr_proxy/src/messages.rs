//! 请求体校验：`{ "messages": [{ "role": ..., "content": ... }, ...] }`

use serde_json::Value;

use cr_core::{ConvoRelayError, Result};
use cr_llm::{PromptAst, PromptNode};

pub const INVALID_MESSAGES: &str = "Invalid messages format";

/// 解析并校验请求体，得到按原顺序排列的 AST
pub fn parse_chat_request(body: &[u8]) -> Result<PromptAst> {
    let json: Value = serde_json::from_slice(body)
        .map_err(|_| ConvoRelayError::MalformedRequest("Invalid request body".to_string()))?;

    let items = json
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| ConvoRelayError::MalformedRequest(INVALID_MESSAGES.to_string()))?;

    items.iter().try_fold(PromptAst::new(), |ast, item| {
        let role = item.get("role").and_then(Value::as_str);
        let content = item.get("content").and_then(Value::as_str);
        match (role, content) {
            (Some(role), Some(content)) => PromptNode::from_role(role, content)
                .map(|node| ast.push(node))
                .ok_or_else(|| {
                    ConvoRelayError::MalformedRequest(format!("unsupported message role: {role}"))
                }),
            _ => Err(ConvoRelayError::MalformedRequest(INVALID_MESSAGES.to_string())),
        }
    })
}
