//! 供需來源模型
//!
//! 每個節點都掛在一個產生或消耗數量的實體上：
//! 活動、採購訂單、調撥、庫存批次或銷售明細。
//! 節點僅持有來源的參考（id），不擁有來源本身。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 供需來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowReason {
    /// 生產活動
    Activity { id: Uuid },

    /// 採購訂單
    PurchaseOrder { id: Uuid },

    /// 調撥
    Transfer { id: Uuid },

    /// 庫存批次（現有庫存）
    InventoryLot { id: Uuid, lot_id: Uuid },

    /// 銷售明細
    SalesLine { id: Uuid },
}

impl FlowReason {
    /// 創建活動來源
    pub fn activity(id: Uuid) -> Self {
        FlowReason::Activity { id }
    }

    /// 創建採購訂單來源
    pub fn purchase_order(id: Uuid) -> Self {
        FlowReason::PurchaseOrder { id }
    }

    /// 創建調撥來源
    pub fn transfer(id: Uuid) -> Self {
        FlowReason::Transfer { id }
    }

    /// 創建庫存批次來源
    pub fn inventory_lot(id: Uuid, lot_id: Uuid) -> Self {
        FlowReason::InventoryLot { id, lot_id }
    }

    /// 創建銷售明細來源
    pub fn sales_line(id: Uuid) -> Self {
        FlowReason::SalesLine { id }
    }

    /// 來源實體 id
    pub fn id(&self) -> Uuid {
        match *self {
            FlowReason::Activity { id }
            | FlowReason::PurchaseOrder { id }
            | FlowReason::Transfer { id }
            | FlowReason::InventoryLot { id, .. }
            | FlowReason::SalesLine { id } => id,
        }
    }

    /// 批次 id（僅庫存批次來源有值）
    pub fn lot_id(&self) -> Option<Uuid> {
        match *self {
            FlowReason::InventoryLot { lot_id, .. } => Some(lot_id),
            _ => None,
        }
    }

    /// 檢查是否為現有庫存
    /// （`in_stock_only` 模式只允許現有庫存，排除未來的生產與採購）
    pub fn is_on_hand(&self) -> bool {
        matches!(self, FlowReason::InventoryLot { .. })
    }
}
