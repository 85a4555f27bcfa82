//! 脚本化执行器（用于测试与离线演示，无需远端服务）
//!
//! 每次 start_* 取出下一段脚本：按序输出原始帧文本；遇到 WaitForInput 时挂起，
//! 直到对应 session 的 resume 到达才继续，模拟远端代理等待人工决策。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use tokio::sync::Notify;

use crate::core::error::{SubmitError, TransportError};
use crate::executor::{ByteStream, RemoteExecutor};
use crate::protocol::{AgentRequest, BatchOrderRequest, ResumeResponse, UserInputRequest};

/// 脚本中的一步
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// 原样输出的一块字节（可以是半帧或多帧）
    Chunk(String),
    /// 挂起直到该 session 收到 resume
    WaitForInput { session_id: String },
    /// 读流失败
    Fail(String),
}

impl ScriptStep {
    /// 一个完整的 `data: <json>\n\n` 帧
    pub fn frame(event: serde_json::Value) -> Self {
        ScriptStep::Chunk(format!("data: {event}\n\n"))
    }
}

#[derive(Default)]
struct Shared {
    /// 正在等待输入的 session
    waiting: Mutex<Option<String>>,
    resumed: Notify,
    /// 收到的 resume 请求（按到达顺序）
    inputs: Mutex<Vec<UserInputRequest>>,
}

#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    started: Mutex<Vec<serde_json::Value>>,
    shared: Arc<Shared>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一段脚本，供下一次 start_* 使用
    pub fn with_script(self, steps: Vec<ScriptStep>) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(steps);
        }
        self
    }

    /// 已收到的 resume 请求
    pub fn inputs(&self) -> Vec<UserInputRequest> {
        self.shared
            .inputs
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// 已收到的启动请求体
    pub fn started(&self) -> Vec<serde_json::Value> {
        self.started.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn next_stream<T: serde::Serialize>(&self, request: &T) -> ByteStream {
        if let (Ok(mut started), Ok(body)) = (self.started.lock(), serde_json::to_value(request)) {
            started.push(body);
        }
        let steps = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_default();
        script_stream(steps, self.shared.clone())
    }

    /// 离线演示：搜索 → 选择商品 → 询问数量 → 结果
    pub fn demo() -> Self {
        use serde_json::json;
        let sid = "demo-session";
        let mut steps = vec![
            ScriptStep::frame(json!({"type": "config", "content": {"temperature": 0.2, "action": "search", "platform": "amazon"}})),
            ScriptStep::frame(json!({"type": "log", "content": "Step 1/25: Opening search results"})),
            ScriptStep::frame(json!({"type": "product_choices", "session_id": sid, "content": {
                "message": "Please select a product:",
                "products": [
                    {"product_name": "Wireless Mouse M185", "price": "$14.99", "rating": "4.5", "product_url": "https://www.amazon.com/dp/B004YAVF8I"},
                    {"product_name": "Ergonomic Mouse MX Vertical", "price": "$89.99", "rating": "4.6", "product_url": "https://www.amazon.com/dp/B07FNJB8TT"}
                ]
            }})),
        ];
        steps.push(ScriptStep::WaitForInput { session_id: sid.to_string() });
        steps.push(ScriptStep::frame(json!({"type": "options", "session_id": sid, "content": {
            "message": "Select quantity", "option_type": "general",
            "options": [{"label": "1"}, {"label": "2"}, {"label": "3"}]
        }})));
        steps.push(ScriptStep::WaitForInput { session_id: sid.to_string() });
        steps.push(ScriptStep::frame(json!({"type": "request_input", "session_id": sid, "content": "Add to cart? (yes/no)"})));
        steps.push(ScriptStep::WaitForInput { session_id: sid.to_string() });
        steps.push(ScriptStep::frame(json!({"type": "result", "content": "{\"product_name\": \"Wireless Mouse M185\", \"price\": \"$14.99\"}"})));
        Self::new().with_script(steps)
    }
}

fn script_stream(steps: Vec<ScriptStep>, shared: Arc<Shared>) -> ByteStream {
    let state = (VecDeque::from(steps), shared);
    Box::pin(stream::unfold(state, |(mut steps, shared)| async move {
        loop {
            let step = match steps.pop_front() {
                Some(step) => step,
                None => return None,
            };
            match step {
                ScriptStep::Chunk(text) => return Some((Ok(Bytes::from(text)), (steps, shared))),
                ScriptStep::Fail(msg) => {
                    steps.clear();
                    return Some((Err(TransportError::Read(msg)), (steps, shared)));
                }
                ScriptStep::WaitForInput { session_id } => {
                    if let Ok(mut waiting) = shared.waiting.lock() {
                        *waiting = Some(session_id);
                    }
                    shared.resumed.notified().await;
                }
            }
        }
    }))
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn start_task(&self, request: &AgentRequest) -> Result<ByteStream, TransportError> {
        Ok(self.next_stream(request))
    }

    async fn start_batch(
        &self,
        request: &BatchOrderRequest,
    ) -> Result<ByteStream, TransportError> {
        Ok(self.next_stream(request))
    }

    async fn resume(&self, request: &UserInputRequest) -> Result<ResumeResponse, SubmitError> {
        if let Ok(mut inputs) = self.shared.inputs.lock() {
            inputs.push(request.clone());
        }
        let matched = match self.shared.waiting.lock() {
            Ok(mut waiting) if waiting.as_deref() == Some(request.session_id.as_str()) => {
                waiting.take();
                true
            }
            _ => false,
        };
        if matched {
            self.shared.resumed.notify_one();
            Ok(ResumeResponse {
                status: "success".to_string(),
                message: None,
            })
        } else {
            Ok(ResumeResponse {
                status: "error".to_string(),
                message: Some("No pending input for this session".to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn stream_waits_for_matching_resume() {
        let exec = ScriptedExecutor::new().with_script(vec![
            ScriptStep::Chunk("a".into()),
            ScriptStep::WaitForInput { session_id: "s1".into() },
            ScriptStep::Chunk("b".into()),
        ]);
        let req = AgentRequest::new(crate::protocol::Platform::Amazon, crate::protocol::Action::Chat, "hi");
        let mut stream = exec.start_task(&req).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("a"));

        let next = tokio::spawn(async move { stream.next().await });
        tokio::task::yield_now().await;

        let wrong = exec
            .resume(&UserInputRequest { session_id: "other".into(), input_data: "x".into() })
            .await
            .unwrap();
        // 等待者可能尚未登记；重试直到匹配
        assert!(wrong.is_error());
        let mut ok = false;
        for _ in 0..50 {
            let resp = exec
                .resume(&UserInputRequest { session_id: "s1".into(), input_data: "0".into() })
                .await
                .unwrap();
            if !resp.is_error() {
                ok = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(ok);
        let chunk = next.await.unwrap().unwrap().unwrap();
        assert_eq!(chunk, Bytes::from("b"));
        assert_eq!(exec.started()[0]["action"], json!("chat"));
    }

    #[tokio::test]
    async fn fail_step_ends_stream_with_error() {
        let exec = ScriptedExecutor::new().with_script(vec![
            ScriptStep::Fail("reset".into()),
            ScriptStep::Chunk("never".into()),
        ]);
        let req = BatchOrderRequest::new(crate::protocol::Platform::Amazon, vec![]);
        let mut stream = exec.start_batch(&req).await.unwrap();
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
