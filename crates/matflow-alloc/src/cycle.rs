//! 週期調整曲線
//!
//! 重疊（管線化）生產時每個週期完成的時刻與數量，
//! 只追加、依完成時刻排序。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use matflow_core::qty;
use matflow_core::Tick;

/// 一筆週期完成記錄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleAdjustment {
    /// 週期序號
    pub cycle: u32,

    /// 完成時刻
    pub completed_at: Tick,

    /// 完成數量
    pub qty: Decimal,
}

/// 週期調整曲線
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CycleAdjustmentProfile {
    entries: Vec<CycleAdjustment>,
}

impl CycleAdjustmentProfile {
    /// 創建空曲線
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一筆週期完成記錄（完成時刻不得早於最後一筆）
    pub fn push(&mut self, cycle: u32, completed_at: Tick, cycle_qty: Decimal) {
        debug_assert!(
            self.entries
                .last()
                .map(|e| completed_at >= e.completed_at)
                .unwrap_or(true),
            "週期完成時刻不得倒退: {}",
            completed_at
        );
        self.entries.push(CycleAdjustment {
            cycle,
            completed_at,
            qty: cycle_qty,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 完成總數量
    pub fn total(&self) -> Decimal {
        qty::snap(self.entries.iter().map(|e| e.qty).sum())
    }

    /// 首尾完成時刻
    pub fn bounds(&self) -> Option<(Tick, Tick)> {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => Some((first.completed_at, last.completed_at)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CycleAdjustment> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_sum() {
        let mut profile = CycleAdjustmentProfile::new();
        profile.push(0, Tick::new(400), Decimal::from(25));
        profile.push(1, Tick::new(600), Decimal::from(25));
        profile.push(2, Tick::new(800), Decimal::from(30));

        assert_eq!(profile.len(), 3);
        assert_eq!(profile.total(), Decimal::from(80));
        assert_eq!(profile.bounds(), Some((Tick::new(400), Tick::new(800))));

        let cycles: Vec<u32> = profile.iter().map(|e| e.cycle).collect();
        assert_eq!(cycles, vec![0, 1, 2]);
    }
}
