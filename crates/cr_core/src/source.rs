//! 外部来源加载：凭证文件与系统指令文件
//!
//! 凭证文件格式：
//!
//! ```json
//! { "API_KEY": "single-key" }
//! { "API_KEY": ["key-a", "key-b"] }
//! ```
//!
//! 加载失败一律返回 [`ConvoRelayError::Configuration`]，由调用方决定是否终止启动。

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConvoRelayError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyField {
    One(String),
    Many(Vec<String>),
}

/// 凭证来源文件的结构
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSource {
    #[serde(rename = "API_KEY", alias = "API_KEYS")]
    api_key: KeyField,
}

impl CredentialSource {
    /// 从 JSON 文本解析
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| {
            ConvoRelayError::Configuration(format!("invalid credential source: {e}"))
        })
    }

    /// 去除空白与空项后的有序凭证列表，结果为空视为配置错误
    pub fn into_keys(self) -> Result<Vec<String>> {
        let raw = match self.api_key {
            KeyField::One(key) => vec![key],
            KeyField::Many(keys) => keys,
        };

        let keys: Vec<String> = raw
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(ConvoRelayError::Configuration(
                "credential source contains no usable API key".to_string(),
            ));
        }
        Ok(keys)
    }
}

/// 读取凭证文件并返回有序凭证列表
pub fn load_credentials(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ConvoRelayError::Configuration(format!(
            "cannot read credential source {}: {e}",
            path.display()
        ))
    })?;

    let keys = CredentialSource::from_json(&raw)?.into_keys()?;
    tracing::info!(count = keys.len(), source = %path.display(), "credentials loaded");
    Ok(keys)
}

/// 读取系统指令文本，原样使用（允许为空）
pub fn load_instructions(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        ConvoRelayError::Configuration(format!(
            "cannot read instruction source {}: {e}",
            path.display()
        ))
    })?;
    tracing::info!(bytes = text.len(), source = %path.display(), "instructions loaded");
    Ok(text)
}
