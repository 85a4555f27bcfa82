//! 运行聚合与状态机
//!
//! Idle → Running → Completed | Failed；Running 期间可反复进入/退出 AwaitingInput
//! （由是否有打开的提示派生，不改变 is_running）。Timeline / 提示 / 批量状态只在此处被修改。

use serde::Serialize;

use crate::core::error::{SubmitError, TransportError};
use crate::core::state::RunSnapshot;
use crate::protocol::{Action, Platform};
use crate::session::batch::BatchTracker;
use crate::session::prompts::{Answer, DecisionFamily, PromptRegistry, Submission};
use crate::session::timeline::{LogBody, Timeline};

/// 运行阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

/// 本次运行的种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunKind {
    Single { action: Action },
    Batch,
}

#[derive(Debug)]
pub struct Run {
    /// 每次 begin 自增；过期代次的流事件与回传结果被丢弃
    generation: u64,
    phase: RunPhase,
    platform: Option<Platform>,
    kind: Option<RunKind>,
    pub(crate) timeline: Timeline,
    pub(crate) prompts: PromptRegistry,
    pub(crate) batch: BatchTracker,
}

impl Default for Run {
    fn default() -> Self {
        Self::new()
    }
}

impl Run {
    pub fn new() -> Self {
        Self {
            generation: 0,
            phase: RunPhase::Idle,
            platform: None,
            kind: None,
            timeline: Timeline::new(),
            prompts: PromptRegistry::new(),
            batch: BatchTracker::new(),
        }
    }

    /// 开始新运行：清空时间线、提示与批量状态，返回新代次
    pub fn begin(&mut self, platform: Platform, kind: RunKind) -> u64 {
        self.generation += 1;
        self.phase = RunPhase::Running;
        self.platform = Some(platform);
        self.kind = Some(kind);
        self.timeline.clear();
        self.prompts.clear();
        self.batch.clear();
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn awaiting_input(&self) -> bool {
        self.is_running() && self.prompts.any_open()
    }

    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    pub fn kind(&self) -> Option<RunKind> {
        self.kind
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    pub fn batch(&self) -> &BatchTracker {
        &self.batch
    }

    /// 流正常结束；提示保持可见，直到被成功回传或新运行清空
    pub fn complete(&mut self) {
        if self.phase == RunPhase::Running {
            self.phase = RunPhase::Completed;
        }
    }

    /// 传输层错误：追加一条错误条目并进入 Failed
    pub fn fail(&mut self, err: &TransportError) {
        self.timeline.error(err.to_string());
        self.phase = RunPhase::Failed;
    }

    /// 校验回答；失败时追加错误条目，提示保持打开
    pub fn prepare_submission(
        &mut self,
        family: DecisionFamily,
        answer: Answer,
    ) -> Option<Submission> {
        match self.prompts.prepare(family, answer) {
            Ok(sub) => Some(sub),
            Err(e) => {
                self.reject_submission(family, &e);
                None
            }
        }
    }

    /// 提交错误只进时间线，不影响运行阶段
    pub fn reject_submission(&mut self, family: DecisionFamily, err: &SubmitError) {
        self.timeline
            .error(format!("Failed to submit {family} answer: {err}"));
    }

    /// 应用回传结果：成功则关闭对应提示并追加确认条目；失败则追加错误条目，提示保持打开
    pub fn finish_submission(&mut self, submission: &Submission, outcome: Result<(), SubmitError>) {
        match outcome {
            Ok(()) => {
                self.prompts.close(submission.family, submission.prompt_id);
                let text = match submission.family {
                    DecisionFamily::FreeText => format!("Sent: {}", submission.label),
                    _ => format!("Selected: {}", submission.label),
                };
                self.timeline.text(text);
            }
            Err(e) => self.reject_submission(submission.family, &e),
        }
    }

    /// 只读快照（UI 与测试读取）
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            generation: self.generation,
            phase: self.phase,
            is_running: self.is_running(),
            awaiting_input: self.awaiting_input(),
            platform: self.platform,
            kind: self.kind,
            timeline: self.timeline.entries().to_vec(),
            prompts: self.prompts.open_prompts().into_iter().cloned().collect(),
            batch: self.batch.items().to_vec(),
            batch_counts: self.batch.counts(),
        }
    }

    pub(crate) fn push_log(&mut self, body: LogBody) {
        self.timeline.push(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::prompts::PromptChoices;
    use crate::session::timeline::LogKind;

    #[test]
    fn begin_resets_state_and_bumps_generation() {
        let mut run = Run::new();
        let g1 = run.begin(Platform::Amazon, RunKind::Batch);
        run.timeline.text("old");
        run.prompts.open("s", "q", PromptChoices::FreeText);
        let g2 = run.begin(Platform::Flipkart, RunKind::Single { action: Action::Search });
        assert_eq!(g2, g1 + 1);
        assert!(run.timeline().is_empty());
        assert!(!run.prompts().any_open());
        assert!(!run.is_current(g1));
        assert_eq!(run.platform(), Some(Platform::Flipkart));
    }

    #[test]
    fn awaiting_input_is_derived_from_open_prompts() {
        let mut run = Run::new();
        run.begin(Platform::Amazon, RunKind::Single { action: Action::Order });
        assert!(!run.awaiting_input());
        run.prompts.open("s", "OTP?", PromptChoices::FreeText);
        assert!(run.awaiting_input());
        assert!(run.is_running());
    }

    #[test]
    fn completion_keeps_prompts_visible() {
        let mut run = Run::new();
        run.begin(Platform::Amazon, RunKind::Single { action: Action::Order });
        run.prompts.open("s", "OTP?", PromptChoices::FreeText);
        run.complete();
        assert_eq!(run.phase(), RunPhase::Completed);
        assert!(!run.is_running());
        assert!(run.prompts().any_open());
        assert!(!run.awaiting_input());
    }

    #[test]
    fn failure_appends_single_error_entry() {
        let mut run = Run::new();
        run.begin(Platform::Amazon, RunKind::Batch);
        run.fail(&TransportError::Read("connection reset".into()));
        assert_eq!(run.phase(), RunPhase::Failed);
        assert_eq!(run.timeline().len(), 1);
        assert_eq!(run.timeline().entries()[0].kind(), LogKind::Error);
        assert!(run.timeline().entries()[0].display_text().contains("connection reset"));
    }

    #[test]
    fn failed_submission_keeps_prompt_open() {
        let mut run = Run::new();
        run.begin(Platform::Amazon, RunKind::Single { action: Action::Order });
        run.prompts.open("s", "OTP?", PromptChoices::FreeText);
        let sub = run
            .prepare_submission(DecisionFamily::FreeText, Answer::Text("1234".into()))
            .unwrap();
        run.finish_submission(&sub, Err(SubmitError::Rejected("No pending input".into())));
        assert!(run.prompts().is_open(DecisionFamily::FreeText));
        assert_eq!(run.timeline().entries()[0].kind(), LogKind::Error);

        run.finish_submission(&sub, Ok(()));
        assert!(!run.prompts().is_open(DecisionFamily::FreeText));
        assert_eq!(run.timeline().entries()[1].display_text(), "Sent: 1234");
    }

    #[test]
    fn submission_without_prompt_is_reported_not_fatal() {
        let mut run = Run::new();
        run.begin(Platform::Amazon, RunKind::Batch);
        assert!(run
            .prepare_submission(DecisionFamily::Address, Answer::Choice(0))
            .is_none());
        assert!(run.is_running());
        assert_eq!(run.timeline().entries()[0].kind(), LogKind::Error);
    }
}
