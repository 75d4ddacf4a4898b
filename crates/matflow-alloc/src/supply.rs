//! 供應曲線
//!
//! 記錄生產產出、採購到貨、調撥入庫與現有庫存在各時刻
//! 貢獻的數量，並負責儲區目的地分配與棄置簿記。

use rust_decimal::Decimal;
use std::collections::BTreeSet;
use uuid::Uuid;

use matflow_core::qty;
use matflow_core::{
    FlowError, NodeArena, QuantityProfile, Result, StorageArea, SupplyId, SupplyNode, Tick,
};

/// 供應曲線
#[derive(Debug, Default)]
pub struct SupplyProfile {
    profile: QuantityProfile<SupplyId>,
}

impl SupplyProfile {
    /// 創建空的供應曲線
    pub fn new() -> Self {
        Self::default()
    }

    /// 底層時序曲線
    pub fn profile(&self) -> &QuantityProfile<SupplyId> {
        &self.profile
    }

    pub fn node_count(&self) -> usize {
        self.profile.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_empty()
    }

    /// 放入供應節點（有序插入）
    pub fn add(&mut self, arena: &mut NodeArena, node: SupplyNode) -> Result<SupplyId> {
        let date = node.body().date().ok_or(FlowError::DateNotSet)?;
        let id = arena.insert_supply(node);
        self.profile.insert(date, id);
        Ok(id)
    }

    /// 加到尾端（要求時刻不早於最後一桶）
    pub fn push_back(&mut self, arena: &mut NodeArena, node: SupplyNode) -> Result<SupplyId> {
        let date = node.body().date().ok_or(FlowError::DateNotSet)?;
        let id = arena.insert_supply(node);
        self.profile.push_back(date, id)?;
        Ok(id)
    }

    /// 原始總數量
    pub fn total_qty(&self, arena: &NodeArena) -> Decimal {
        qty::snap(
            self.profile
                .iter_nodes()
                .map(|(_, id)| arena.supply(id).body().original_qty())
                .sum(),
        )
    }

    /// 扣除消耗後的剩餘數量
    pub fn remaining_qty(&self, arena: &NodeArena) -> Decimal {
        qty::snap(
            self.profile
                .iter_nodes()
                .map(|(_, id)| arena.supply(id).body().current_qty())
                .sum(),
        )
    }

    /// 本回合尚未分配的數量
    pub fn unallocated_qty(&self, arena: &NodeArena) -> Decimal {
        qty::snap(
            self.profile
                .iter_nodes()
                .map(|(_, id)| arena.supply(id).body().unallocated_qty())
                .sum(),
        )
    }

    /// 分配回合開始前重設所有節點
    pub fn reset_for_allocation(&self, arena: &mut NodeArena) {
        for (_, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            arena.supply_mut(id).body_mut().reset_for_allocation();
        }
    }

    /// 可用區間：(最早可用時刻, 最晚可用時刻)。
    /// 後處理延遲可用性的節點以可用時刻計，可能晚於產出時刻。
    pub fn usage_range(&self, arena: &NodeArena) -> Option<(Tick, Tick)> {
        let mut range: Option<(Tick, Tick)> = None;
        for (_, id) in self.profile.iter_nodes() {
            let available = match arena.supply(id).available_date() {
                Some(t) => t,
                None => continue,
            };
            range = Some(match range {
                None => (available, available),
                Some((lo, hi)) => (lo.min(available), hi.max(available)),
            });
        }
        range
    }

    /// 供應來源的庫存集合
    pub fn source_inventories(&self, arena: &NodeArena) -> BTreeSet<Uuid> {
        self.profile
            .iter_nodes()
            .filter(|(_, id)| arena.supply(*id).reason().is_on_hand())
            .map(|(_, id)| arena.supply(id).reason().id())
            .collect()
    }

    /// 併入另一條供應曲線；`other` 呼叫後邏輯上為空
    pub fn merge(&mut self, other: &mut SupplyProfile) {
        self.profile.merge(&mut other.profile);
    }

    /// 轉移 `other` 在區間內的桶，回傳被轉移的剩餘數量總和
    pub fn transfer_range(
        &mut self,
        arena: &NodeArena,
        other: &mut SupplyProfile,
        start: Tick,
        end: Tick,
    ) -> Decimal {
        let moved = self.profile.transfer_range(&mut other.profile, start, end);
        qty::snap(
            moved
                .iter()
                .map(|id| arena.supply(*id).body().current_qty())
                .sum(),
        )
    }

    /// 整條曲線轉移
    pub fn transfer_all(&mut self, arena: &NodeArena, other: &mut SupplyProfile) -> Decimal {
        self.transfer_range(arena, other, Tick(i64::MIN), Tick(i64::MAX))
    }

    /// 轉移不晚於模擬時鐘的部分
    pub fn transfer_until(
        &mut self,
        arena: &NodeArena,
        clock: Tick,
        other: &mut SupplyProfile,
    ) -> Decimal {
        self.transfer_range(arena, other, Tick(i64::MIN), clock)
    }

    /// 拆下節點並標記移除；桶變空時一併移除
    pub fn remove(&mut self, arena: &mut NodeArena, id: SupplyId) -> bool {
        let date = match arena.supply(id).body().date() {
            Some(d) => d,
            None => return false,
        };
        let removed = self.profile.remove(date, id);
        if removed {
            arena.supply_mut(id).body_mut().mark_removed();
        }
        removed
    }

    /// 清空曲線，所有節點標記移除（放棄模擬分支時使用）
    pub fn clear(&mut self, arena: &mut NodeArena) {
        for id in self.profile.clear() {
            arena.supply_mut(id).body_mut().mark_removed();
        }
    }

    /// 為每個節點的未入庫數量分配儲區目的地，
    /// 放不下的部分記為棄置
    pub fn allocate_storage(&self, arena: &mut NodeArena, areas: &mut [Box<dyn StorageArea>]) {
        for (_, sid) in self.profile.iter_nodes().collect::<Vec<_>>() {
            let node = arena.supply(sid);
            let from = match node.available_date() {
                Some(t) => t,
                None => continue,
            };
            let lot = node.stored_lot().or_else(|| node.reason().lot_id());
            let prior_discard = node.discard_qty().unwrap_or_default();
            let mut to_store = qty::snap(
                node.body().current_qty() - node.storage_allocated_qty() - prior_discard,
            );
            if qty::approx_zero(to_store) {
                continue;
            }

            for area in areas.iter_mut() {
                if qty::approx_zero(to_store) {
                    break;
                }
                if !area.is_empty() {
                    if area.require_empty() {
                        continue;
                    }
                    let same_lot = lot.map(|l| area.holds_lot(l)).unwrap_or(false);
                    if !(area.allow_same_lot_when_occupied() && same_lot) {
                        continue;
                    }
                }
                let take = to_store.min(area.capacity_remaining());
                if qty::approx_zero(take) {
                    continue;
                }
                if area.schedule_storage(take, from).is_none() {
                    continue;
                }
                arena.supply_mut(sid).add_storage_allocation(area.id(), take);
                to_store = qty::snap(to_store - take);
            }

            if !qty::approx_zero(to_store) {
                arena
                    .supply_mut(sid)
                    .set_discard_qty(qty::snap(prior_discard + to_store));
            }
        }
    }

    /// 清除所有節點與儲區上的分配
    pub fn reset_storage_allocations(
        &self,
        arena: &mut NodeArena,
        areas: &mut [Box<dyn StorageArea>],
    ) {
        for (_, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            arena.supply_mut(id).reset_storage_allocation();
        }
        for area in areas.iter_mut() {
            area.reset_allocation();
        }
    }
}
