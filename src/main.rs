//! Agent Desk - 远程电商代理的人机协作控制台
//!
//! 入口：加载配置、初始化日志、创建执行器与会话编排器，并运行 TUI 主循环。

use agent_desk::{
    config::{load_config, AppConfig},
    core::create_session,
    executor::create_executor_from_config,
    observability,
    ui::{run_app, ConsoleDefaults},
};
use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 配置失败时退回默认值；此时日志尚未初始化，原因在日志就绪后补记
    let (cfg, config_error) = match load_config(None) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    observability::init(&cfg.app.log_file).context("Failed to initialize logging")?;
    if let Some(e) = config_error {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }
    tracing::info!(
        name = cfg.app.name.as_deref().unwrap_or("agent-desk"),
        mode = %cfg.executor.mode,
        "Starting"
    );

    let executor = create_executor_from_config(&cfg).context("Failed to create executor")?;

    // 会话编排：返回命令发送端与快照接收端
    let (cmd_tx, state_rx) = create_session(executor);

    let defaults = ConsoleDefaults {
        platform: cfg.defaults.platform,
        temperature: cfg.defaults.temperature,
    };
    run_app(state_rx, cmd_tx, defaults)
        .await
        .context("App run failed")?;

    Ok(())
}
