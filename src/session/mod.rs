//! 会话核心：时间线、提示登记表、批量进度、事件分发、运行状态机

pub mod batch;
pub mod dispatcher;
pub mod prompts;
pub mod run;
pub mod timeline;

pub use batch::{BatchCounts, BatchTracker};
pub use dispatcher::{dispatch, Dispatched};
pub use prompts::{
    Answer, DecisionFamily, PendingPrompt, PromptChoices, PromptRegistry, Submission,
};
pub use run::{Run, RunKind, RunPhase};
pub use timeline::{LogBody, LogEntry, LogKind, Timeline};
