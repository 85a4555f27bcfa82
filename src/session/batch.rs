//! 批量进度：整体快照替换，计数每次从快照扫描得出

use serde::Serialize;

use crate::protocol::{BatchItem, BatchItemStatus};

/// 从快照统计出的计数
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// pending + in_progress
    pub active: usize,
}

#[derive(Clone, Debug, Default)]
pub struct BatchTracker {
    items: Vec<BatchItem>,
}

impl BatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用新快照整体替换（后写者胜，不做逐项合并）
    pub fn replace(&mut self, snapshot: Vec<BatchItem>) {
        self.items = snapshot;
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn counts(&self) -> BatchCounts {
        counts_of(&self.items)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}

pub fn counts_of(items: &[BatchItem]) -> BatchCounts {
    items.iter().fold(
        BatchCounts {
            total: items.len(),
            ..BatchCounts::default()
        },
        |mut c, item| {
            match item.status {
                BatchItemStatus::Success => c.success += 1,
                BatchItemStatus::Failed => c.failed += 1,
                BatchItemStatus::Pending | BatchItemStatus::InProgress => c.active += 1,
            }
            c
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, status: BatchItemStatus) -> BatchItem {
        BatchItem {
            index,
            url: format!("https://shop/{index}"),
            quantity: 1,
            color: None,
            status,
            message: None,
            error: None,
        }
    }

    #[test]
    fn snapshot_replaces_never_merges() {
        let mut t = BatchTracker::new();
        t.replace(vec![item(0, BatchItemStatus::Pending)]);
        t.replace(vec![
            item(0, BatchItemStatus::Success),
            item(1, BatchItemStatus::Pending),
        ]);
        assert_eq!(t.items().len(), 2);
        assert_eq!(t.items()[0].status, BatchItemStatus::Success);
        assert_eq!(t.items()[1].status, BatchItemStatus::Pending);

        t.replace(vec![item(5, BatchItemStatus::Failed)]);
        assert_eq!(t.items().len(), 1);
        assert_eq!(t.items()[0].index, 5);
    }

    #[test]
    fn counts_follow_latest_snapshot() {
        let mut t = BatchTracker::new();
        t.replace(vec![
            item(0, BatchItemStatus::Success),
            item(1, BatchItemStatus::Failed),
            item(2, BatchItemStatus::InProgress),
            item(3, BatchItemStatus::Pending),
        ]);
        assert_eq!(
            t.counts(),
            BatchCounts { total: 4, success: 1, failed: 1, active: 2 }
        );
        t.replace(vec![item(0, BatchItemStatus::Success)]);
        assert_eq!(
            t.counts(),
            BatchCounts { total: 1, success: 1, failed: 0, active: 0 }
        );
    }
}
