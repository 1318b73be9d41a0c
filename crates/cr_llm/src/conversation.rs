//! 对话日志
//!
//! 只追加的有序轮次记录，插入顺序即模型上下文顺序。日志本身从不淘汰；
//! 发往模型时回放多少由 [`ContextWindow`] 决定。

use crate::Turn;

/// 上下文回放策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextWindow {
    /// 回放全部轮次
    #[default]
    Full,
    /// 只回放最近 n 个轮次（n 为 0 时按 1 处理，保证当前输入总在其中）
    MostRecent(usize),
}

/// 对话日志
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// 全部轮次快照
    pub fn as_context(&self) -> &[Turn] {
        &self.turns
    }

    /// 按回放策略截取的上下文
    pub fn window(&self, policy: ContextWindow) -> &[Turn] {
        match policy {
            ContextWindow::Full => &self.turns,
            ContextWindow::MostRecent(n) => {
                let n = n.max(1);
                let start = self.turns.len().saturating_sub(n);
                &self.turns[start..]
            }
        }
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}
