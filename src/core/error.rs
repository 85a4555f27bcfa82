//! 错误分类
//!
//! - 帧解码错误：单帧 JSON 非法，仅进诊断日志，流继续
//! - 传输错误：启动请求失败或读流中断，当前运行终止
//! - 提交错误：回传决策失败，提示保持打开，操作员可重试

use thiserror::Error;

use crate::session::DecisionFamily;

/// 单帧解码失败（不可见于操作员）
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid JSON frame ({source}): {body}")]
    Json {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 已知事件类型的 content 与预期结构不符，按畸形事件处理
#[derive(Error, Debug)]
#[error("malformed {kind} payload: {source}")]
pub struct PayloadError {
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// 事件流层面的错误，对当前运行是致命的
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("executor responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stream read failed: {0}")]
    Read(String),

    /// 请求未发出即被本地校验拒绝
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// 回传决策失败；对应提示保持打开
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("no pending {0} prompt")]
    NoPendingPrompt(DecisionFamily),

    #[error("choice {index} is out of range (0..{len})")]
    ChoiceOutOfRange { index: usize, len: usize },

    #[error("answer is empty")]
    EmptyAnswer,

    #[error("{0} answer is already being submitted")]
    InFlight(DecisionFamily),

    #[error("resume request failed: {0}")]
    Transport(String),

    #[error("executor responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("executor rejected input: {0}")]
    Rejected(String),
}

/// 事件无法分发（畸形事件）；只进诊断日志，不影响运行
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("{0} event has no session_id")]
    MissingSession(&'static str),
}
