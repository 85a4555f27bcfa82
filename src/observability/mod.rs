//! 可观测性：tracing 初始化与诊断日志
//!
//! TUI 占用终端，日志写入文件。畸形帧与畸形事件只写到 `agent_desk::diagnostics` target，
//! 操作员在时间线中看不到它们。

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::core::error::{DecodeError, DispatchError};
use crate::protocol::EventKind;

/// 诊断日志 target，可用 `RUST_LOG=agent_desk::diagnostics=debug` 单独打开
pub const DIAGNOSTICS: &str = "agent_desk::diagnostics";

/// 初始化全局 subscriber；RUST_LOG 未设置时默认 info
pub fn init(log_file: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// 单帧 JSON 解析失败
pub fn frame_dropped(err: &DecodeError) {
    tracing::warn!(target: DIAGNOSTICS, error = %err, "Dropping malformed frame");
}

/// 事件结构不符或缺少 session_id
pub fn event_dropped(kind: Option<EventKind>, err: &DispatchError) {
    let kind = kind.map(|k| k.as_str()).unwrap_or("<none>");
    tracing::warn!(target: DIAGNOSTICS, kind, error = %err, "Dropping malformed event");
}
