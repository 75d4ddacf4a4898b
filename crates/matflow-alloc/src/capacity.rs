//! 產能耗用曲線
//!
//! 只追加、依時刻排序的產能耗用記錄，按類別彙總。
//! 不分桶、不合併，也沒有分配狀態機。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use matflow_core::qty;
use matflow_core::Tick;

/// 產能耗用類別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapacityCategory {
    /// 換線
    Setup,

    /// 生產
    Run,

    /// 後處理
    PostProcessing,

    /// 清機
    Clean,

    /// 倉儲占用
    Storage,
}

/// 一筆產能耗用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityUsage {
    /// 耗用時刻
    pub at: Tick,

    /// 類別
    pub category: CapacityCategory,

    /// 耗用量
    pub qty: Decimal,
}

/// 產能耗用曲線
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CapacityUsageProfile {
    entries: Vec<CapacityUsage>,
}

impl CapacityUsageProfile {
    /// 創建空曲線
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一筆耗用（時刻不得早於最後一筆）
    pub fn push(&mut self, at: Tick, category: CapacityCategory, usage_qty: Decimal) {
        debug_assert!(
            self.entries.last().map(|e| at >= e.at).unwrap_or(true),
            "產能耗用時刻不得倒退: {}",
            at
        );
        self.entries.push(CapacityUsage {
            at,
            category,
            qty: usage_qty,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 總耗用量
    pub fn total(&self) -> Decimal {
        qty::snap(self.entries.iter().map(|e| e.qty).sum())
    }

    /// 指定類別的總耗用量
    pub fn total_for(&self, category: CapacityCategory) -> Decimal {
        qty::snap(
            self.entries
                .iter()
                .filter(|e| e.category == category)
                .map(|e| e.qty)
                .sum(),
        )
    }

    /// 首尾時刻
    pub fn bounds(&self) -> Option<(Tick, Tick)> {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => Some((first.at, last.at)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapacityUsage> {
        self.entries.iter()
    }

    /// 指定類別的記錄
    pub fn iter_category(
        &self,
        category: CapacityCategory,
    ) -> impl Iterator<Item = &CapacityUsage> {
        self.entries.iter().filter(move |e| e.category == category)
    }
}
