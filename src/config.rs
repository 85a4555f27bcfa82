//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AGENT_DESK__*` 覆盖（双下划线表示嵌套，如 `AGENT_DESK__EXECUTOR__BASE_URL=http://host:8000`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::protocol::Platform;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub executor: ExecutorSection,
    pub timeouts: TimeoutsSection,
    pub defaults: DefaultsSection,
}

/// [app] 段：应用名与日志文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// TUI 占用终端，tracing 输出写到此文件
    pub log_file: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            log_file: PathBuf::from("agent-desk.log"),
        }
    }
}

/// 执行器后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    #[default]
    Http,
    /// 内置脚本演示，无需远端服务
    Mock,
}

impl std::fmt::Display for ExecutorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorMode::Http => f.write_str("http"),
            ExecutorMode::Mock => f.write_str("mock"),
        }
    }
}

/// [executor] 段：后端选择与端点路径
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub mode: ExecutorMode,
    pub base_url: String,
    pub stream_path: String,
    pub batch_path: String,
    pub input_path: String,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            mode: ExecutorMode::Http,
            base_url: "http://localhost:8000".to_string(),
            stream_path: "/agent/stream".to_string(),
            batch_path: "/agent/batch-order".to_string(),
            input_path: "/agent/input".to_string(),
        }
    }
}

/// [timeouts] 段（秒）。事件流本身没有超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    pub connect: u64,
    /// 单次回传请求
    pub resume: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            connect: 10,
            resume: 30,
        }
    }
}

/// [defaults] 段：控制台发起任务时的默认参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub platform: Platform,
    pub temperature: Option<f64>,
}

impl AppConfig {
    /// 加载后的一致性检查：http 模式需要可用的 base_url，端点路径以 `/` 开头，回传超时非零
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let exec = &self.executor;
        if exec.mode == ExecutorMode::Http
            && !(exec.base_url.starts_with("http://") || exec.base_url.starts_with("https://"))
        {
            return Err(config::ConfigError::Message(format!(
                "executor.base_url must be an http(s) URL, got {:?}",
                exec.base_url
            )));
        }
        for (key, path) in [
            ("stream_path", &exec.stream_path),
            ("batch_path", &exec.batch_path),
            ("input_path", &exec.input_path),
        ] {
            if !path.starts_with('/') {
                return Err(config::ConfigError::Message(format!(
                    "executor.{key} must start with '/', got {path:?}"
                )));
            }
        }
        if self.timeouts.resume == 0 {
            return Err(config::ConfigError::Message(
                "timeouts.resume must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 AGENT_DESK__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AGENT_DESK__*（双下划线表示嵌套键）
/// 4. 反序列化后执行 [`AppConfig::validate`]；未知的 executor.mode 在反序列化时即报错
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AGENT_DESK")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
