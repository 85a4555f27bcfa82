//! 会话编排器：主控循环
//!
//! 建立 cmd/state 两个通道，由单个后台任务独占 Run：消费 UI 命令（StartTask/StartBatch/Answer/Quit），
//! 以及读流循环与回传任务发回的内部消息。每次修改 Run 后发布一次快照。
//! 读流循环与回传任务都带代次，过期代次的消息直接丢弃。

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::core::error::{DecodeError, SubmitError, TransportError};
use crate::core::state::RunSnapshot;
use crate::core::{ResumeSubmitter, SessionSupervisor};
use crate::executor::{ByteStream, RemoteExecutor};
use crate::observability;
use crate::protocol::{AgentRequest, BatchOrderRequest, Event, FrameDecoder, Platform};
use crate::session::{dispatch, Answer, DecisionFamily, Run, RunKind, Submission};

/// 从 UI 发往编排器的操作员命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 启动单任务（search / order / chat）
    StartTask(AgentRequest),
    /// 启动批量下单
    StartBatch(BatchOrderRequest),
    /// 回答某一族的打开提示
    Answer {
        family: DecisionFamily,
        answer: Answer,
    },
    /// 退出应用
    Quit,
}

/// 后台任务发回主控循环的消息
#[derive(Debug)]
enum Internal {
    Event {
        generation: u64,
        event: Event,
    },
    StreamEnded {
        generation: u64,
    },
    StreamFailed {
        generation: u64,
        error: TransportError,
    },
    Submitted {
        generation: u64,
        submission: Submission,
        outcome: Result<(), SubmitError>,
    },
}

/// 已通过校验、带 session_id 的启动请求
#[derive(Debug, Clone)]
enum StartRequest {
    Task(AgentRequest),
    Batch(BatchOrderRequest),
}

impl StartRequest {
    fn platform(&self) -> Platform {
        match self {
            StartRequest::Task(r) => r.platform,
            StartRequest::Batch(r) => r.platform,
        }
    }

    fn kind(&self) -> RunKind {
        match self {
            StartRequest::Task(r) => RunKind::Single { action: r.action },
            StartRequest::Batch(_) => RunKind::Batch,
        }
    }

    fn validated(self) -> Result<Self, TransportError> {
        Ok(match self {
            StartRequest::Task(r) => StartRequest::Task(r.validated()?),
            StartRequest::Batch(r) => StartRequest::Batch(r.validated()?),
        })
    }

    /// 未指定 session_id 时为本次运行生成一个
    fn with_session(self) -> Self {
        let fresh = || uuid::Uuid::new_v4().to_string();
        match self {
            StartRequest::Task(mut r) => {
                r.session_id.get_or_insert_with(fresh);
                StartRequest::Task(r)
            }
            StartRequest::Batch(mut r) => {
                r.session_id.get_or_insert_with(fresh);
                StartRequest::Batch(r)
            }
        }
    }

    async fn open(&self, executor: &dyn RemoteExecutor) -> Result<ByteStream, TransportError> {
        match self {
            StartRequest::Task(r) => executor.start_task(r).await,
            StartRequest::Batch(r) => executor.start_batch(r).await,
        }
    }
}

struct Controller {
    run: Run,
    executor: Arc<dyn RemoteExecutor>,
    submitter: ResumeSubmitter,
    supervisor: SessionSupervisor,
    internal_tx: mpsc::UnboundedSender<Internal>,
    /// 正在回传中的提示 id，防止同一提示被重复提交
    in_flight: HashSet<u64>,
}

impl Controller {
    fn start(&mut self, request: StartRequest) {
        let platform = request.platform();
        let kind = request.kind();
        // 无论新请求能否通过校验，上一次运行都到此为止
        self.in_flight.clear();
        let request = match request.validated() {
            Ok(r) => r.with_session(),
            Err(e) => {
                tracing::warn!(error = %e, "Rejected start request");
                self.supervisor.cancel_current();
                self.run.begin(platform, kind);
                self.run.fail(&e);
                return;
            }
        };

        let generation = self.run.begin(platform, kind);
        let token = self.supervisor.replace();
        tracing::info!(generation, %platform, ?kind, "Starting run");
        tokio::spawn(stream_loop(
            self.executor.clone(),
            request,
            generation,
            token,
            self.internal_tx.clone(),
        ));
    }

    fn answer(&mut self, family: DecisionFamily, answer: Answer) {
        let busy = self
            .run
            .prompts()
            .get(family)
            .is_some_and(|p| self.in_flight.contains(&p.id));
        if busy {
            self.run
                .reject_submission(family, &SubmitError::InFlight(family));
            return;
        }
        let Some(submission) = self.run.prepare_submission(family, answer) else {
            return;
        };
        self.in_flight.insert(submission.prompt_id);

        let generation = self.run.generation();
        let submitter = self.submitter.clone();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let outcome = submitter
                .submit(&submission.session_id, &submission.input_data)
                .await;
            if let Err(e) = &outcome {
                tracing::warn!(family = %submission.family, error = %e, "Resume failed");
            }
            let _ = tx.send(Internal::Submitted {
                generation,
                submission,
                outcome,
            });
        });
    }

    fn apply(&mut self, msg: Internal) {
        match msg {
            Internal::Event { generation, event } => {
                if !self.run.is_current(generation) {
                    return;
                }
                if let Err(e) = dispatch(&mut self.run, &event) {
                    observability::event_dropped(event.kind, &e);
                }
            }
            Internal::StreamEnded { generation } => {
                if self.run.is_current(generation) {
                    tracing::info!(generation, "Event stream ended");
                    self.run.complete();
                }
            }
            Internal::StreamFailed { generation, error } => {
                if self.run.is_current(generation) {
                    tracing::error!(generation, error = %error, "Event stream failed");
                    self.run.fail(&error);
                }
            }
            Internal::Submitted {
                generation,
                submission,
                outcome,
            } => {
                if !self.run.is_current(generation) {
                    tracing::debug!(generation, "Dropping stale submission outcome");
                    return;
                }
                self.in_flight.remove(&submission.prompt_id);
                self.run.finish_submission(&submission, outcome);
            }
        }
    }
}

/// 读流循环：字节块 → 帧解码 → 事件，逐个发回主控循环；token 取消时静默退出
async fn stream_loop(
    executor: Arc<dyn RemoteExecutor>,
    request: StartRequest,
    generation: u64,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<Internal>,
) {
    let opened = tokio::select! {
        _ = token.cancelled() => return,
        opened = request.open(executor.as_ref()) => opened,
    };
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(error) => {
            let _ = tx.send(Internal::StreamFailed { generation, error });
            return;
        }
    };

    let mut decoder = FrameDecoder::new();
    loop {
        let next = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(generation, "Stream loop cancelled");
                return;
            }
            next = stream.next() => next,
        };
        match next {
            Some(Ok(chunk)) => forward(decoder.push(&chunk), generation, &tx),
            Some(Err(error)) => {
                let _ = tx.send(Internal::StreamFailed { generation, error });
                return;
            }
            None => {
                forward(decoder.finish(), generation, &tx);
                let _ = tx.send(Internal::StreamEnded { generation });
                return;
            }
        }
    }
}

fn forward(
    decoded: Vec<Result<Event, DecodeError>>,
    generation: u64,
    tx: &mpsc::UnboundedSender<Internal>,
) {
    for result in decoded {
        match result {
            Ok(event) => {
                let _ = tx.send(Internal::Event { generation, event });
            }
            Err(e) => observability::frame_dropped(&e),
        }
    }
}

/// 创建会话运行时：返回命令发送端与快照接收端；后台任务消费命令并发布快照。
/// 命令发送端全部关闭或收到 Quit 时退出，并取消仍在运行的读流循环。
pub fn create_session(
    executor: Arc<dyn RemoteExecutor>,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<RunSnapshot>) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(RunSnapshot::default());
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<Internal>();

    let mut controller = Controller {
        run: Run::new(),
        submitter: ResumeSubmitter::new(executor.clone()),
        executor,
        supervisor: SessionSupervisor::new(),
        internal_tx,
        in_flight: HashSet::new(),
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::StartTask(r)) => controller.start(StartRequest::Task(r)),
                        Some(Command::StartBatch(r)) => controller.start(StartRequest::Batch(r)),
                        Some(Command::Answer { family, answer }) => controller.answer(family, answer),
                        Some(Command::Quit) | None => break,
                    }
                }
                Some(msg) = internal_rx.recv() => controller.apply(msg),
            }
            let _ = state_tx.send(controller.run.snapshot());
        }
        controller.supervisor.shutdown();
        tracing::info!("Session loop stopped");
    });

    (cmd_tx, state_rx)
}
