//! 状态投影：RunSnapshot
//!
//! 编排器独占 Run 并在每次变更后发布快照；UI 与测试只读快照，不接触 Run 本身。

use std::sync::Arc;

use serde::Serialize;

use crate::protocol::{BatchItem, Platform};
use crate::session::{BatchCounts, DecisionFamily, LogEntry, PendingPrompt, RunKind, RunPhase};

/// UI 看到的不可变快照
#[derive(Clone, Debug, Serialize)]
pub struct RunSnapshot {
    pub generation: u64,
    pub phase: RunPhase,
    pub is_running: bool,
    /// Running 且至少一个提示打开
    pub awaiting_input: bool,
    pub platform: Option<Platform>,
    pub kind: Option<RunKind>,
    /// 与 Run 共享的条目
    pub timeline: Vec<Arc<LogEntry>>,
    /// 打开中的提示，按族固定顺序
    pub prompts: Vec<PendingPrompt>,
    pub batch: Vec<BatchItem>,
    pub batch_counts: BatchCounts,
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            phase: RunPhase::Idle,
            is_running: false,
            awaiting_input: false,
            platform: None,
            kind: None,
            timeline: Vec::new(),
            prompts: Vec::new(),
            batch: Vec::new(),
            batch_counts: BatchCounts::default(),
        }
    }
}

impl RunSnapshot {
    pub fn prompt(&self, family: DecisionFamily) -> Option<&PendingPrompt> {
        self.prompts.iter().find(|p| p.family() == family)
    }

    pub fn open_families(&self) -> Vec<DecisionFamily> {
        self.prompts.iter().map(PendingPrompt::family).collect()
    }
}
