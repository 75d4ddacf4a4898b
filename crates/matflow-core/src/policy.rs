//! 分配政策與外部協作介面
//!
//! 適用性規則（批次碼、效期、損耗）與儲區都是外部子系統，
//! 核心只透過這裡的 trait 使用它們。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Tick;
use crate::node::SupplyNode;

/// 分配方向政策（庫存／分配組態的屬性，逐次分配時選用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllocationDirection {
    /// 未設定（視同由舊到新）
    #[default]
    Unset,

    /// 由舊到新（自第一桶正向走訪）
    OldestFirst,

    /// 由新到舊（自模擬時鐘所在桶反向走訪）
    NewestFirst,
}

impl AllocationDirection {
    /// 檢查是否為由新到舊
    pub fn is_newest_first(self) -> bool {
        self == AllocationDirection::NewestFirst
    }
}

/// 供應節點適用性政策
///
/// 比對演算法的第一輪採嚴格批次規則，第二輪放寬批次限制
/// （[`EligibilityPolicy::lot_satisfied`]）；可用性規則
/// （效期、損耗）兩輪都適用。
pub trait EligibilityPolicy {
    /// 嚴格批次碼比對
    fn lot_matches(&self, supply: &SupplyNode) -> bool {
        let _ = supply;
        true
    }

    /// 放寬條件：批次自身的需求已全數滿足
    /// （避免不必要的批次碎裂，仍須通過可用性規則）
    fn lot_satisfied(&self, supply: &SupplyNode) -> bool {
        let _ = supply;
        false
    }

    /// 可用性檢查（效期、損耗上限、未過期）
    fn usable(&self, supply: &SupplyNode, now: Tick) -> bool {
        let _ = (supply, now);
        true
    }

    /// 適用性覆寫擴充點；回傳 `Some` 時取代其餘所有規則
    fn override_eligibility(&self, supply: &SupplyNode) -> Option<bool> {
        let _ = supply;
        None
    }
}

/// 無任何限制的政策
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRestrictions;

impl EligibilityPolicy for NoRestrictions {}

/// 儲區介面（容量簿記由外部子系統實作）
pub trait StorageArea {
    /// 儲區 id
    fn id(&self) -> Uuid;

    /// 儲區目前是否為空
    fn is_empty(&self) -> bool;

    /// 儲區是否已持有指定批次
    fn holds_lot(&self, lot: Uuid) -> bool;

    /// 是否要求入庫時儲區必須為空
    fn require_empty(&self) -> bool {
        false
    }

    /// 非空儲區是否允許放入同批次
    fn allow_same_lot_when_occupied(&self) -> bool {
        true
    }

    /// 尚可容納的數量
    fn capacity_remaining(&self) -> Decimal;

    /// 排定入庫；回傳占用結束時刻（無法排定時回傳 `None`）
    fn schedule_storage(&mut self, qty: Decimal, from: Tick) -> Option<Tick>;

    /// 重設儲區上的分配
    fn reset_allocation(&mut self);
}
