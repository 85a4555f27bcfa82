//! Agent Desk - 远程电商代理的人机协作控制台
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排、快照、读流监管、决策回传、错误分类
//! - **executor**: 远端执行器抽象与实现（HTTP / 脚本化 Mock）
//! - **observability**: tracing 初始化与诊断日志
//! - **protocol**: 事件帧解码、事件结构、请求体
//! - **session**: 时间线、提示登记表、批量进度、事件分发、运行状态机
//! - **ui**: Ratatui TUI 界面

pub mod config;
pub mod core;
pub mod executor;
pub mod observability;
pub mod protocol;
pub mod session;
pub mod ui;
