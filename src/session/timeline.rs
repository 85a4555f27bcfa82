//! 日志时间线：只追加、按到达顺序排列的可渲染条目
//!
//! 条目以 Arc 持有，快照只复制指针，不复制条目内容。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::{BatchComplete, BatchStart};

/// 条目类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Text,
    Error,
    Success,
    StructuredResult,
    BatchStart,
    BatchComplete,
}

/// 条目内容，与类别一一对应
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum LogBody {
    Text(String),
    Error(String),
    Success(String),
    StructuredResult(serde_json::Value),
    BatchStart(BatchStart),
    BatchComplete(BatchComplete),
}

#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    pub body: LogBody,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(body: LogBody) -> Self {
        Self {
            body,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> LogKind {
        match &self.body {
            LogBody::Text(_) => LogKind::Text,
            LogBody::Error(_) => LogKind::Error,
            LogBody::Success(_) => LogKind::Success,
            LogBody::StructuredResult(_) => LogKind::StructuredResult,
            LogBody::BatchStart(_) => LogKind::BatchStart,
            LogBody::BatchComplete(_) => LogKind::BatchComplete,
        }
    }

    /// 单行展示文本
    pub fn display_text(&self) -> String {
        match &self.body {
            LogBody::Text(s) | LogBody::Error(s) | LogBody::Success(s) => s.clone(),
            LogBody::StructuredResult(v) => describe_structured(v),
            LogBody::BatchStart(b) => match &b.platform {
                Some(p) => format!("Batch started: {} items on {}", b.total_items, p),
                None => format!("Batch started: {} items", b.total_items),
            },
            LogBody::BatchComplete(c) => c.summary(),
        }
    }
}

/// 结构化结果：对象按 `key: value` 拼接，其它值原样输出
fn describe_structured(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => format!("{k}: {s}"),
                other => format!("{k}: {other}"),
            })
            .collect::<Vec<_>>()
            .join(" | "),
        other => other.to_string(),
    }
}

/// 时间线：条目一旦追加就不再修改或删除；只有新运行开始时整体清空
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    entries: Vec<Arc<LogEntry>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, body: LogBody) {
        self.entries.push(Arc::new(LogEntry::new(body)));
    }

    pub fn text(&mut self, s: impl Into<String>) {
        self.push(LogBody::Text(s.into()));
    }

    pub fn error(&mut self, s: impl Into<String>) {
        self.push(LogBody::Error(s.into()));
    }

    pub fn entries(&self) -> &[Arc<LogEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_keep_arrival_order() {
        let mut t = Timeline::new();
        t.text("a");
        t.error("b");
        t.push(LogBody::Success("c".into()));
        let kinds: Vec<LogKind> = t.entries().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![LogKind::Text, LogKind::Error, LogKind::Success]);
        assert!(t.entries()[0].created_at <= t.entries()[2].created_at);
    }

    #[test]
    fn cloned_entries_share_storage() {
        let mut t = Timeline::new();
        t.text("a");
        let before = t.entries().to_vec();
        t.text("b");
        let after = t.entries().to_vec();
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert_eq!(Arc::strong_count(&after[0]), 3);
    }

    #[test]
    fn batch_complete_displays_counts() {
        let entry = LogEntry::new(LogBody::BatchComplete(BatchComplete {
            total: 4,
            success: 3,
            failed: 1,
            results: vec![],
            usage: None,
        }));
        assert_eq!(
            entry.display_text(),
            "Batch complete: 3 succeeded, 1 failed, 4 total"
        );
    }

    #[test]
    fn structured_result_lists_fields() {
        let entry = LogEntry::new(LogBody::StructuredResult(
            json!({"product_name": "X", "price": "$9"}),
        ));
        let text = entry.display_text();
        assert!(text.contains("product_name: X"));
        assert!(text.contains("price: $9"));
    }
}
