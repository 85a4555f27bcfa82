//! 读流监管：同一时刻只有一个读流循环
//!
//! 每次开始新运行时取消上一个循环的 token 并发放新的子 token；退出时取消根 token，所有循环随之结束。
//! 注意：取消只停止本地读流，不会通知远端执行器停止。

use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct SessionSupervisor {
    /// 应用退出时触发
    root: CancellationToken,
    /// 当前运行的读流循环
    current: Option<CancellationToken>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            current: None,
        }
    }

    /// 取消上一个读流循环（若有），返回新循环使用的子 token
    pub fn replace(&mut self) -> CancellationToken {
        self.cancel_current();
        let token = self.root.child_token();
        self.current = Some(token.clone());
        token
    }

    /// 取消当前读流循环而不启动新的（新运行在本地校验阶段即失败时）
    pub fn cancel_current(&mut self) {
        if let Some(old) = self.current.take() {
            if !old.is_cancelled() {
                tracing::info!("Cancelling active stream loop");
            }
            old.cancel();
        }
    }

    /// 退出：取消全部
    pub fn shutdown(&mut self) {
        self.root.cancel();
        self.current = None;
    }

    pub fn is_shutdown(&self) -> bool {
        self.root.is_cancelled()
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_cancels_previous_loop() {
        let mut sup = SessionSupervisor::new();
        let first = sup.replace();
        let second = sup.replace();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn cancel_current_leaves_supervisor_usable() {
        let mut sup = SessionSupervisor::new();
        let first = sup.replace();
        sup.cancel_current();
        assert!(first.is_cancelled());
        sup.cancel_current();
        let next = sup.replace();
        assert!(!next.is_cancelled());
        assert!(!sup.is_shutdown());
    }

    #[test]
    fn shutdown_cancels_children() {
        let mut sup = SessionSupervisor::new();
        let token = sup.replace();
        sup.shutdown();
        assert!(token.is_cancelled());
        assert!(sup.is_shutdown());
    }
}
