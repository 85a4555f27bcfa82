//! 事件流协议：事件外壳与各类型 content 的结构
//!
//! 外壳 `{type, content, session_id?}` 在解码时确定；content 由 Dispatcher 按 type 再解析为具体结构。

use serde::{Deserialize, Serialize};

use crate::core::error::PayloadError;

/// 事件类型（封闭集合）；未知值归入 `Unknown`，由 Dispatcher 忽略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Config,
    BatchStart,
    BatchStatus,
    BatchComplete,
    Log,
    RequestInput,
    ProductChoices,
    AddressChoices,
    PaymentChoices,
    Options,
    Result,
    Error,
    #[serde(other)]
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Config => "config",
            EventKind::BatchStart => "batch_start",
            EventKind::BatchStatus => "batch_status",
            EventKind::BatchComplete => "batch_complete",
            EventKind::Log => "log",
            EventKind::RequestInput => "request_input",
            EventKind::ProductChoices => "product_choices",
            EventKind::AddressChoices => "address_choices",
            EventKind::PaymentChoices => "payment_choices",
            EventKind::Options => "options",
            EventKind::Result => "result",
            EventKind::Error => "error",
            EventKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解码后的单个事件；解码后不再修改，由 Dispatcher 恰好消费一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 缺失 type 的事件为 None（畸形事件，分发时为 no-op）
    #[serde(rename = "type", default)]
    pub kind: Option<EventKind>,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Event {
    pub fn new(kind: EventKind, content: serde_json::Value) -> Self {
        Self {
            kind: Some(kind),
            content,
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// 将 content 解析为该类型的具体结构
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, PayloadError> {
        serde_json::from_value(self.content.clone()).map_err(|source| PayloadError {
            kind: self.kind.unwrap_or(EventKind::Unknown).as_str(),
            source,
        })
    }

    /// 文本类 content：字符串原样返回，其它 JSON 值序列化为紧凑文本
    pub fn content_text(&self) -> String {
        match &self.content {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// `config` 事件：本次运行的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

/// `batch_start` 事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStart {
    pub total_items: usize,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// 批量子订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

/// 批量中的一项；index 在批次开始时确定，此后只有 status/message/error 变化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(rename = "product_url")]
    pub url: String,
    pub quantity: u32,
    #[serde(default)]
    pub color: Option<String>,
    pub status: BatchItemStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `batch_complete` 事件：汇总计数与结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchComplete {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    #[serde(default)]
    pub results: Vec<BatchItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
}

impl BatchComplete {
    pub fn summary(&self) -> String {
        format!(
            "Batch complete: {} succeeded, {} failed, {} total",
            self.success, self.failed, self.total
        )
    }
}

fn default_product_message() -> String {
    "Please select a product:".to_string()
}

fn default_address_message() -> String {
    "Please select a delivery address:".to_string()
}

fn default_payment_message() -> String {
    "Please select a payment method:".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    #[serde(rename = "product_name")]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub rating: String,
    #[serde(rename = "product_url", default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductChoices {
    #[serde(default = "default_product_message")]
    pub message: String,
    pub products: Vec<ProductOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressOption {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// HOME / WORK / NEW 等
    #[serde(default)]
    pub address_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressChoices {
    #[serde(default = "default_address_message")]
    pub message: String,
    pub addresses: Vec<AddressOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOption {
    pub method: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentChoices {
    #[serde(default = "default_payment_message")]
    pub message: String,
    pub payments: Vec<PaymentOption>,
}

/// 通用选项的类别，影响展示样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    #[default]
    General,
    Warning,
    Info,
    Action,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoices {
    pub message: String,
    pub options: Vec<OptionItem>,
    #[serde(default)]
    pub option_type: OptionKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_maps_to_unknown_kind() {
        let ev: Event = serde_json::from_value(json!({"type": "usage", "content": {"steps": 3}})).unwrap();
        assert_eq!(ev.kind, Some(EventKind::Unknown));
    }

    #[test]
    fn missing_type_decodes_to_none() {
        let ev: Event = serde_json::from_value(json!({"content": "x"})).unwrap();
        assert_eq!(ev.kind, None);
    }

    #[test]
    fn product_payload_uses_wire_field_names() {
        let ev = Event::new(
            EventKind::ProductChoices,
            json!({
                "message": "Pick one",
                "products": [{"product_name": "Mouse", "price": "$9", "rating": "4.5", "product_url": "https://x/1"}]
            }),
        );
        let p: ProductChoices = ev.payload().unwrap();
        assert_eq!(p.products[0].name, "Mouse");
        assert_eq!(p.products[0].url.as_deref(), Some("https://x/1"));
    }

    #[test]
    fn batch_item_reads_product_url_and_status() {
        let item: BatchItem = serde_json::from_value(json!({
            "index": 0, "product_url": "https://x/1", "quantity": 2,
            "color": null, "status": "in_progress", "message": null, "error": null
        }))
        .unwrap();
        assert_eq!(item.url, "https://x/1");
        assert_eq!(item.status, BatchItemStatus::InProgress);
    }

    #[test]
    fn payload_error_names_kind() {
        let ev = Event::new(EventKind::AddressChoices, json!({"message": "m"}));
        let err = ev.payload::<AddressChoices>().unwrap_err();
        assert_eq!(err.kind, "address_choices");
    }

    #[test]
    fn options_default_to_general_kind() {
        let ev = Event::new(
            EventKind::Options,
            json!({"message": "Qty?", "options": [{"label": "1"}]}),
        );
        let o: OptionChoices = ev.payload().unwrap();
        assert_eq!(o.option_type, OptionKind::General);
    }
}
