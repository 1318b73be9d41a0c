//! Prompt AST 与方言编译器
//!
//! 出站负载先组织为 AST（系统指令 + 完整对话），再按 Provider 方言编译：
//! Gemini 原生格式见 `provider::gemini_common`，OpenAI 风格 `messages`
//! 同时也是代理边界的请求格式。

use serde::{Deserialize, Serialize};

use crate::{Role, Turn};

/// Prompt AST 节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptNode {
    System(String),
    User(String),
    Assistant(String),
}

impl PromptNode {
    /// 按 OpenAI 风格角色名构造节点，未知角色返回 `None`
    pub fn from_role(role: &str, content: impl Into<String>) -> Option<Self> {
        match role {
            "system" => Some(PromptNode::System(content.into())),
            "user" => Some(PromptNode::User(content.into())),
            "assistant" => Some(PromptNode::Assistant(content.into())),
            _ => None,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            PromptNode::System(_) => "system",
            PromptNode::User(_) => "user",
            PromptNode::Assistant(_) => "assistant",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            PromptNode::System(v) | PromptNode::User(v) | PromptNode::Assistant(v) => v,
        }
    }
}

impl From<&Turn> for PromptNode {
    fn from(turn: &Turn) -> Self {
        match turn.role() {
            Role::User => PromptNode::User(turn.text().to_string()),
            Role::Assistant => PromptNode::Assistant(turn.text().to_string()),
        }
    }
}

/// Prompt AST 容器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptAst {
    nodes: Vec<PromptNode>,
}

impl PromptAst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, node: PromptNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(&self) -> &[PromptNode] {
        &self.nodes
    }

    /// 系统指令在前，随后按时间顺序排列的对话；空指令不产生系统节点
    pub fn from_context<'a>(
        system_instruction: &str,
        turns: impl IntoIterator<Item = &'a Turn>,
    ) -> Self {
        let mut ast = Self::new();
        if !system_instruction.is_empty() {
            ast = ast.push(PromptNode::System(system_instruction.to_string()));
        }
        turns
            .into_iter()
            .fold(ast, |ast, turn| ast.push(PromptNode::from(turn)))
    }

    /// OpenAI 兼容 messages JSON
    pub fn to_openai_messages(&self) -> Vec<serde_json::Value> {
        self.nodes
            .iter()
            .map(|node| serde_json::json!({ "role": node.role(), "content": node.content() }))
            .collect()
    }
}
