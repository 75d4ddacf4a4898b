//! 供需節點模型
//!
//! 節點是最小單位：某個來源在某個時刻產生或需要的一筆數量，
//! 帶有可變的分配／消耗狀態。共用簿記放在 [`NodeBody`]，
//! 由供應與需求兩種節點各自內嵌，變體行為以明確的欄位與方法表達。
//!
//! 數量欄位的關係：
//! - `original_qty`：建立時的數量，永不變動
//! - `current_qty`：扣除消耗後的剩餘，只減不增
//! - `remaining_unallocated_qty`：尚未被保留的部分（跨分配回合持續）
//! - `unallocated_qty`：本回合尚未投入分配的部分，
//!   每回合開始以 [`NodeBody::reset_for_allocation`] 重設
//!
//! 不變量：`0 ≤ unallocated ≤ current ≤ original`（容差內），
//! 違反即為程式缺陷，於除錯組建立即中止。

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::arena::{DemandId, SupplyId};
use crate::clock::Tick;
use crate::qty;
use crate::reason::FlowReason;
use crate::{FlowError, Result};

/// 節點共用簿記
#[derive(Debug, Clone)]
pub struct NodeBody {
    date: Option<Tick>,
    original_qty: Decimal,
    current_qty: Decimal,
    unallocated_qty: Decimal,
    remaining_unallocated_qty: Decimal,
    removed: bool,
}

impl NodeBody {
    /// 創建新的節點簿記（四個數量欄位皆為初始數量）
    pub fn new(qty: Decimal) -> Self {
        debug_assert!(qty >= Decimal::ZERO, "節點數量不可為負: {}", qty);
        Self {
            date: None,
            original_qty: qty,
            current_qty: qty,
            unallocated_qty: qty,
            remaining_unallocated_qty: qty,
            removed: false,
        }
    }

    /// 節點時刻
    pub fn date(&self) -> Option<Tick> {
        self.date
    }

    /// 設定節點時刻；時刻一經設定即不可變更
    pub fn set_date(&mut self, date: Tick) -> Result<()> {
        if self.date.is_some() {
            return Err(FlowError::DateAlreadySet);
        }
        self.date = Some(date);
        Ok(())
    }

    pub fn original_qty(&self) -> Decimal {
        self.original_qty
    }

    pub fn current_qty(&self) -> Decimal {
        self.current_qty
    }

    pub fn unallocated_qty(&self) -> Decimal {
        self.unallocated_qty
    }

    pub fn remaining_unallocated_qty(&self) -> Decimal {
        self.remaining_unallocated_qty
    }

    pub fn removed(&self) -> bool {
        self.removed
    }

    /// 標記節點已自曲線移除
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    /// 分配回合開始前重設（冪等：連續呼叫兩次與一次等價）
    pub fn reset_for_allocation(&mut self) {
        self.unallocated_qty = self.remaining_unallocated_qty;
        self.check();
    }

    /// 保留一筆數量（自本回合未分配數量扣除）
    ///
    /// 前置條件：`qty ≤ unallocated_qty`（容差內）。
    pub fn reserve(&mut self, qty: Decimal) {
        debug_assert!(
            qty::approx_le(qty, self.unallocated_qty),
            "保留數量 {} 超過未分配數量 {}",
            qty,
            self.unallocated_qty
        );
        self.unallocated_qty = qty::snap(self.unallocated_qty - qty);
        self.check();
    }

    /// 保留一筆數量；數量不足時回傳錯誤
    pub fn try_reserve(&mut self, qty: Decimal) -> Result<()> {
        if !qty::approx_le(qty, self.unallocated_qty) {
            return Err(FlowError::OverAllocation {
                requested: qty,
                available: self.unallocated_qty,
            });
        }
        self.reserve(qty);
        Ok(())
    }

    /// 退回一筆保留（測試分配回滾時使用）
    pub fn unreserve(&mut self, qty: Decimal) {
        self.unallocated_qty = qty::snap(self.unallocated_qty + qty);
        debug_assert!(
            qty::approx_le(self.unallocated_qty, self.remaining_unallocated_qty),
            "退回後未分配數量 {} 超過尚未保留數量 {}",
            self.unallocated_qty,
            self.remaining_unallocated_qty
        );
        self.check();
    }

    /// 將一筆保留轉為正式分配（跨回合持續）
    pub fn commit_reservation(&mut self, qty: Decimal) {
        debug_assert!(
            qty::approx_le(qty, self.remaining_unallocated_qty),
            "正式分配數量 {} 超過尚未保留數量 {}",
            qty,
            self.remaining_unallocated_qty
        );
        self.remaining_unallocated_qty = qty::snap(self.remaining_unallocated_qty - qty);
        self.check();
    }

    /// 消耗一筆數量（分配轉為實際扣減時使用）
    pub fn consume(&mut self, qty: Decimal) {
        debug_assert!(
            qty::approx_le(qty, self.current_qty),
            "消耗數量 {} 超過剩餘數量 {}",
            qty,
            self.current_qty
        );
        self.current_qty = qty::snap(self.current_qty - qty);
        self.check();
    }

    fn check(&self) {
        debug_assert!(
            qty::approx_ge(self.unallocated_qty, Decimal::ZERO)
                && qty::approx_le(self.unallocated_qty, self.current_qty)
                && qty::approx_le(self.current_qty, self.original_qty),
            "節點數量不變量被破壞: unallocated={} current={} original={}",
            self.unallocated_qty,
            self.current_qty,
            self.original_qty
        );
    }
}

/// 需求節點分配階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandPhase {
    /// 尚未分配
    Unallocated,
    /// 已測試分配（可逆的可行性探測）
    TestAllocated,
    /// 已正式分配
    Committed,
    /// 分配已消耗
    Consumed,
}

/// 需求節點持有的分配連結
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// 供應節點
    pub supply: SupplyId,

    /// 分配數量
    pub qty: Decimal,
}

/// 提前期分配（視為提前期過後即可取得的強制滿足）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadTimeAllocation {
    /// 指定庫存
    pub inventory: Uuid,

    /// 數量
    pub qty: Decimal,
}

/// 短缺分配（供應不足時自指定庫存的強制滿足）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortageAllocation {
    /// 指定庫存
    pub inventory: Uuid,

    /// 數量
    pub qty: Decimal,

    /// 需求時刻是否落在計劃時界之後
    pub past_planning_horizon: bool,
}

/// 供應節點的儲區分配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageAllocation {
    /// 目的儲區
    pub area: Uuid,

    /// 數量
    pub qty: Decimal,
}

/// 需求節點
#[derive(Debug, Clone)]
pub struct DemandNode {
    body: NodeBody,
    reason: FlowReason,
    phase: DemandPhase,
    allocations: Vec<Allocation>,
    lead_time_allocation: Option<LeadTimeAllocation>,
    shortage_allocation: Option<ShortageAllocation>,
}

impl DemandNode {
    /// 創建新的需求節點
    pub fn new(reason: FlowReason, qty: Decimal, date: Tick) -> Self {
        let mut body = NodeBody::new(qty);
        body.date = Some(date);
        Self {
            body,
            reason,
            phase: DemandPhase::Unallocated,
            allocations: Vec::new(),
            lead_time_allocation: None,
            shortage_allocation: None,
        }
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut NodeBody {
        &mut self.body
    }

    pub fn reason(&self) -> &FlowReason {
        &self.reason
    }

    pub fn phase(&self) -> DemandPhase {
        self.phase
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn lead_time_allocation(&self) -> Option<&LeadTimeAllocation> {
        self.lead_time_allocation.as_ref()
    }

    pub fn shortage_allocation(&self) -> Option<&ShortageAllocation> {
        self.shortage_allocation.as_ref()
    }

    /// 已分配總數量（含提前期與短缺分配）
    pub fn allocated_qty(&self) -> Decimal {
        let linked: Decimal = self.allocations.iter().map(|a| a.qty).sum();
        let lead = self.lead_time_allocation.map(|a| a.qty).unwrap_or_default();
        let short = self.shortage_allocation.map(|a| a.qty).unwrap_or_default();
        qty::snap(linked + lead + short)
    }

    /// 記錄一筆對供應節點的分配（同一供應節點的分配會合併）
    pub fn add_allocation(&mut self, supply: SupplyId, alloc_qty: Decimal) {
        if let Some(existing) = self.allocations.iter_mut().find(|a| a.supply == supply) {
            existing.qty = qty::snap(existing.qty + alloc_qty);
        } else {
            self.allocations.push(Allocation {
                supply,
                qty: alloc_qty,
            });
        }
    }

    /// 記錄提前期分配
    pub fn set_lead_time_allocation(&mut self, inventory: Uuid, alloc_qty: Decimal) {
        debug_assert!(self.lead_time_allocation.is_none(), "提前期分配已存在");
        self.lead_time_allocation = Some(LeadTimeAllocation {
            inventory,
            qty: alloc_qty,
        });
    }

    /// 記錄短缺分配
    pub fn set_shortage_allocation(
        &mut self,
        inventory: Uuid,
        alloc_qty: Decimal,
        past_planning_horizon: bool,
    ) {
        debug_assert!(self.shortage_allocation.is_none(), "短缺分配已存在");
        self.shortage_allocation = Some(ShortageAllocation {
            inventory,
            qty: alloc_qty,
            past_planning_horizon,
        });
    }

    /// 進入測試分配階段
    pub fn begin_test(&mut self) {
        debug_assert!(
            matches!(
                self.phase,
                DemandPhase::Unallocated | DemandPhase::TestAllocated
            ),
            "不可自 {:?} 進入測試分配",
            self.phase
        );
        self.phase = DemandPhase::TestAllocated;
    }

    /// 進入正式分配階段
    pub fn mark_committed(&mut self) {
        debug_assert!(
            matches!(
                self.phase,
                DemandPhase::Unallocated | DemandPhase::TestAllocated | DemandPhase::Committed
            ),
            "不可自 {:?} 進入正式分配",
            self.phase
        );
        self.phase = DemandPhase::Committed;
    }

    /// 標記分配已消耗；重複消耗為呼叫端缺陷
    pub fn mark_consumed(&mut self) {
        debug_assert!(
            self.phase == DemandPhase::Committed,
            "不可自 {:?} 消耗分配",
            self.phase
        );
        self.phase = DemandPhase::Consumed;
    }
}

/// 供應節點
#[derive(Debug, Clone)]
pub struct SupplyNode {
    body: NodeBody,
    reason: FlowReason,
    available_date: Option<Tick>,
    storage_allocations: Vec<StorageAllocation>,
    discard_qty: Option<Decimal>,
    stored_lot: Option<Uuid>,
    consumers: Vec<(DemandId, Decimal)>,
}

impl SupplyNode {
    /// 創建新的供應節點
    pub fn new(reason: FlowReason, qty: Decimal, date: Tick) -> Self {
        let mut body = NodeBody::new(qty);
        body.date = Some(date);
        Self {
            body,
            reason,
            available_date: None,
            storage_allocations: Vec::new(),
            discard_qty: None,
            stored_lot: None,
            consumers: Vec::new(),
        }
    }

    /// 建構器模式：設置可用時刻（後處理延遲可用性時晚於節點時刻）
    pub fn with_available_date(mut self, date: Tick) -> Self {
        debug_assert!(
            self.body.date.map(|d| date >= d).unwrap_or(true),
            "可用時刻 {} 早於節點時刻",
            date
        );
        self.available_date = Some(date);
        self
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut NodeBody {
        &mut self.body
    }

    pub fn reason(&self) -> &FlowReason {
        &self.reason
    }

    /// 可用時刻（未設定時即為節點時刻）
    pub fn available_date(&self) -> Option<Tick> {
        self.available_date.or(self.body.date)
    }

    pub fn storage_allocations(&self) -> &[StorageAllocation] {
        &self.storage_allocations
    }

    pub fn discard_qty(&self) -> Option<Decimal> {
        self.discard_qty
    }

    /// 入庫後建立的批次
    pub fn stored_lot(&self) -> Option<Uuid> {
        self.stored_lot
    }

    pub fn set_stored_lot(&mut self, lot: Uuid) {
        self.stored_lot = Some(lot);
    }

    /// 消耗此節點的需求清單
    pub fn consumers(&self) -> &[(DemandId, Decimal)] {
        &self.consumers
    }

    /// 記錄一筆被需求節點消耗的連結（與需求側分配保持一致）
    pub fn add_consumer(&mut self, demand: DemandId, alloc_qty: Decimal) {
        if let Some(existing) = self.consumers.iter_mut().find(|(d, _)| *d == demand) {
            existing.1 = qty::snap(existing.1 + alloc_qty);
        } else {
            self.consumers.push((demand, alloc_qty));
        }
    }

    /// 記錄一筆儲區分配
    pub fn add_storage_allocation(&mut self, area: Uuid, alloc_qty: Decimal) {
        self.storage_allocations.push(StorageAllocation {
            area,
            qty: alloc_qty,
        });
    }

    /// 已分配儲區的總數量
    pub fn storage_allocated_qty(&self) -> Decimal {
        qty::snap(self.storage_allocations.iter().map(|a| a.qty).sum())
    }

    /// 記錄棄置數量（無處可放或被排擠的部分）
    pub fn set_discard_qty(&mut self, discard: Decimal) {
        self.discard_qty = Some(discard);
    }

    /// 清除儲區與棄置分配
    pub fn reset_storage_allocation(&mut self) {
        self.storage_allocations.clear();
        self.discard_qty = None;
    }
}
