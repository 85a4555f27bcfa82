//! 远端执行器抽象
//!
//! 所有后端（HTTP / 脚本化 Mock）实现 RemoteExecutor：start_task、start_batch 返回原始字节流，
//! resume 回传操作员决策。帧解码与分发在编排器中完成，执行器只负责传输。

pub mod http;
pub mod mock;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::config::{AppConfig, ExecutorMode};
use crate::core::error::{SubmitError, TransportError};
use crate::protocol::{AgentRequest, BatchOrderRequest, ResumeResponse, UserInputRequest};

pub use http::HttpExecutor;
pub use mock::{ScriptStep, ScriptedExecutor};

/// 事件流的原始字节块
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// 启动单任务，返回事件流
    async fn start_task(&self, request: &AgentRequest) -> Result<ByteStream, TransportError>;

    /// 启动批量任务，返回事件流（额外包含 batch_* 事件）
    async fn start_batch(&self, request: &BatchOrderRequest)
        -> Result<ByteStream, TransportError>;

    /// 回传决策；应用层的 status=error 由调用方判断
    async fn resume(&self, request: &UserInputRequest) -> Result<ResumeResponse, SubmitError>;
}

/// 根据配置选择执行器后端
pub fn create_executor_from_config(cfg: &AppConfig) -> anyhow::Result<Arc<dyn RemoteExecutor>> {
    match cfg.executor.mode {
        ExecutorMode::Mock => {
            tracing::warn!("Executor mode is mock, using scripted demo executor");
            Ok(Arc::new(ScriptedExecutor::demo()))
        }
        ExecutorMode::Http => {
            tracing::info!(base_url = %cfg.executor.base_url, "Using HTTP executor");
            Ok(Arc::new(HttpExecutor::from_config(cfg)?))
        }
    }
}
