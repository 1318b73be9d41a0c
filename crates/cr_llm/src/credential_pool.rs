//! 凭证池与轮转游标
//!
//! 固定大小、非空的有序凭证序列，外加一个当前游标。游标启动时随机选取，
//! 使同时启动的多个客户端分散到不同凭证上；之后只做确定性的 `+1 mod N` 轮转。

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;

use crate::{ConvoRelayError, Result};

/// 跨会话共享的凭证池，轮转必须在锁内完成
pub type SharedCredentialPool = Arc<Mutex<CredentialPool>>;

/// 提供商授权凭证
#[derive(Clone)]
pub struct Credential {
    value: String,
    use_count: u64,
}

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            use_count: 0,
        }
    }

    /// 原始凭证值，只应传给提供商
    pub fn value(&self) -> &str {
        &self.value
    }

    /// 用于日志与展示的脱敏形式
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.value.chars().collect();
        if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}...{tail}")
        } else {
            "****".to_string()
        }
    }

    pub fn use_count(&self) -> u64 {
        self.use_count
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &self.masked())
            .field("use_count", &self.use_count)
            .finish()
    }
}

/// 凭证池
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: usize,
}

impl CredentialPool {
    /// 以线程随机数选取初始游标
    pub fn new(keys: Vec<String>) -> Result<Self> {
        Self::with_rng(keys, &mut rand::thread_rng())
    }

    /// 以注入的随机源选取初始游标，测试中用固定种子
    pub fn with_rng<R: Rng + ?Sized>(keys: Vec<String>, rng: &mut R) -> Result<Self> {
        let credentials = Self::build(keys)?;
        let cursor = rng.gen_range(0..credentials.len());
        Ok(Self::finish(credentials, cursor))
    }

    /// 指定初始游标（取模落入范围）
    pub fn with_cursor(keys: Vec<String>, cursor: usize) -> Result<Self> {
        let credentials = Self::build(keys)?;
        let cursor = cursor % credentials.len();
        Ok(Self::finish(credentials, cursor))
    }

    fn build(keys: Vec<String>) -> Result<Vec<Credential>> {
        if keys.is_empty() {
            return Err(ConvoRelayError::Configuration(
                "credential pool cannot be empty".to_string(),
            ));
        }
        Ok(keys.into_iter().map(Credential::new).collect())
    }

    fn finish(credentials: Vec<Credential>, cursor: usize) -> Self {
        tracing::info!(
            size = credentials.len(),
            cursor,
            active = %credentials[cursor].masked(),
            "credential pool initialized"
        );
        Self {
            credentials,
            cursor,
        }
    }

    /// 包装为可共享的池
    pub fn into_shared(self) -> SharedCredentialPool {
        Arc::new(Mutex::new(self))
    }

    /// 当前游标处的凭证
    pub fn current(&self) -> &Credential {
        &self.credentials[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// 游标前进一步，返回新游标
    pub fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % self.credentials.len();
        tracing::debug!(
            cursor = self.cursor,
            active = %self.credentials[self.cursor].masked(),
            "credential pool advanced"
        );
        self.cursor
    }

    /// 记录一次使用，仅用于观测，不影响路由
    pub fn record_use(&mut self, index: usize) {
        if let Some(credential) = self.credentials.get_mut(index) {
            credential.use_count += 1;
        }
    }

    /// `(脱敏凭证, 使用次数)` 快照
    pub fn usage(&self) -> Vec<(String, u64)> {
        self.credentials
            .iter()
            .map(|c| (c.masked(), c.use_count))
            .collect()
    }
}
