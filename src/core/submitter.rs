//! 决策回传
//!
//! 把操作员的回答按 session_id 发回执行器。与读流循环相互独立、可并发；
//! 结果由编排器应用到 Run（成功关闭提示，失败保留提示并记错误）。

use std::sync::Arc;

use crate::core::error::SubmitError;
use crate::executor::RemoteExecutor;
use crate::protocol::UserInputRequest;

#[derive(Clone)]
pub struct ResumeSubmitter {
    executor: Arc<dyn RemoteExecutor>,
}

impl ResumeSubmitter {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { executor }
    }

    /// 发送 `{session_id, input_data}`；HTTP 非 2xx 或应答 status=error 均视为失败
    pub async fn submit(&self, session_id: &str, input_data: &str) -> Result<(), SubmitError> {
        let request = UserInputRequest {
            session_id: session_id.to_string(),
            input_data: input_data.to_string(),
        };
        let response = self.executor.resume(&request).await?;
        if response.is_error() {
            return Err(SubmitError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "executor returned error status".to_string()),
            ));
        }
        tracing::info!(session_id, "resume accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ScriptedExecutor;

    #[tokio::test]
    async fn unknown_session_is_rejected() {
        let exec = Arc::new(ScriptedExecutor::new());
        let submitter = ResumeSubmitter::new(exec.clone());
        let err = submitter.submit("ghost", "0").await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected(ref m) if m.contains("No pending input")));
        assert_eq!(exec.inputs().len(), 1);
        assert_eq!(exec.inputs()[0].session_id, "ghost");
    }
}
