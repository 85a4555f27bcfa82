//! 发往远端执行器的请求体：启动单任务、启动批量、回传决策

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::error::TransportError;

/// 电商平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Amazon,
    Flipkart,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Amazon => write!(f, "amazon"),
            Platform::Flipkart => write!(f, "flipkart"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "amazon" => Ok(Platform::Amazon),
            "flipkart" => Ok(Platform::Flipkart),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// 单任务动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Search,
    Order,
    Chat,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Search => write!(f, "search"),
            Action::Order => write!(f, "order"),
            Action::Chat => write!(f, "chat"),
        }
    }
}

/// 启动单任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub platform: Platform,
    pub action: Action,
    #[serde(default)]
    pub user_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl AgentRequest {
    pub fn new(platform: Platform, action: Action, user_message: impl Into<String>) -> Self {
        Self {
            platform,
            action,
            user_message: user_message.into(),
            product_url: None,
            quantity: None,
            color: None,
            session_id: None,
            temperature: None,
        }
    }

    pub fn order(platform: Platform, product_url: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_url: Some(product_url.into()),
            quantity: Some(quantity),
            ..Self::new(platform, Action::Order, "")
        }
    }

    /// 发送前的本地校验；temperature 截断到 [0, 1]
    pub fn validated(mut self) -> Result<Self, TransportError> {
        if self.action == Action::Order
            && self.product_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(TransportError::InvalidRequest(
                "Product URL required for order action".to_string(),
            ));
        }
        if self.quantity == Some(0) {
            return Err(TransportError::InvalidRequest(
                "quantity must be at least 1".to_string(),
            ));
        }
        self.temperature = self.temperature.map(|t| t.clamp(0.0, 1.0));
        Ok(self)
    }
}

fn default_quantity() -> u32 {
    1
}

/// 批量中的一项（CSV 已由上游整理成此结构）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOrderItem {
    pub product_url: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub color: Option<String>,
}

/// 启动批量任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOrderRequest {
    pub platform: Platform,
    pub items: Vec<BatchOrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl BatchOrderRequest {
    pub fn new(platform: Platform, items: Vec<BatchOrderItem>) -> Self {
        Self {
            platform,
            items,
            additional_instructions: None,
            session_id: None,
            temperature: None,
        }
    }

    pub fn validated(mut self) -> Result<Self, TransportError> {
        if self.items.is_empty() {
            return Err(TransportError::InvalidRequest(
                "batch has no items".to_string(),
            ));
        }
        if let Some(pos) = self.items.iter().position(|i| i.quantity == 0) {
            return Err(TransportError::InvalidRequest(format!(
                "item {} has quantity 0",
                pos + 1
            )));
        }
        if let Some(pos) = self.items.iter().position(|i| i.product_url.trim().is_empty()) {
            return Err(TransportError::InvalidRequest(format!(
                "item {} has no product_url",
                pos + 1
            )));
        }
        self.temperature = self.temperature.map(|t| t.clamp(0.0, 1.0));
        Ok(self)
    }
}

/// 回传操作员决策
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInputRequest {
    pub session_id: String,
    pub input_data: String,
}

/// 回传接口的应答；status 为 "error" 视为失败，其它值（"ok" / "success"）视为成功
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ResumeResponse {
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error")
    }
}

/// 从 JSON 文件读取批量条目（`[{product_url, quantity?, color?}]`）
pub fn load_batch_items(path: &Path) -> anyhow::Result<Vec<BatchOrderItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let items: Vec<BatchOrderItem> = serde_json::from_str(&raw)
        .with_context(|| format!("Batch file {} is not a JSON item list", path.display()))?;
    Ok(items)
}
