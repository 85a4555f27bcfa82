//! HTTP 执行器（reqwest）
//!
//! POST {base}/agent/stream、{base}/agent/batch-order 返回 text/event-stream；POST {base}/agent/input 回传决策。
//! 事件流本身不设超时（运行可能长时间等待人工输入），只有连接与回传请求受超时限制。

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;

use crate::config::AppConfig;
use crate::core::error::{SubmitError, TransportError};
use crate::executor::{ByteStream, RemoteExecutor};
use crate::protocol::{AgentRequest, BatchOrderRequest, ResumeResponse, UserInputRequest};

pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: String,
    stream_path: String,
    batch_path: String,
    input_path: String,
    resume_timeout: Duration,
}

impl HttpExecutor {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::from_config(&AppConfig {
            executor: crate::config::ExecutorSection {
                base_url: base_url.into(),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(cfg.timeouts.connect))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: cfg.executor.base_url.trim_end_matches('/').to_string(),
            stream_path: cfg.executor.stream_path.clone(),
            batch_path: cfg.executor.batch_path.clone(),
            input_path: cfg.executor.input_path.clone(),
            resume_timeout: Duration::from_secs(cfg.timeouts.resume),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn open_stream<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ByteStream, TransportError> {
        let url = self.url(path);
        tracing::debug!(%url, "opening event stream");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Read(e.to_string())));
        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl RemoteExecutor for HttpExecutor {
    async fn start_task(&self, request: &AgentRequest) -> Result<ByteStream, TransportError> {
        self.open_stream(&self.stream_path, request).await
    }

    async fn start_batch(
        &self,
        request: &BatchOrderRequest,
    ) -> Result<ByteStream, TransportError> {
        self.open_stream(&self.batch_path, request).await
    }

    async fn resume(&self, request: &UserInputRequest) -> Result<ResumeResponse, SubmitError> {
        let response = self
            .client
            .post(self.url(&self.input_path))
            .timeout(self.resume_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ResumeResponse>()
            .await
            .map_err(|e| SubmitError::Transport(format!("invalid resume response: {e}")))
    }
}
