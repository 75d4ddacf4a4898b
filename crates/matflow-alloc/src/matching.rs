//! 供需比對演算法
//!
//! 依方向政策與適用性規則走訪供應曲線，將需求數量分配到
//! 供應節點上。第一輪採嚴格批次規則；未滿足時游標重設回起點，
//! 第二輪放寬批次限制（僅允許自身需求已滿足的批次），
//! 可用性規則兩輪不變。
//!
//! 供應不足不是錯誤：走訪耗盡後把未滿足的餘量回傳給呼叫端，
//! 由呼叫端決定提前期回退、短缺分配或維持未滿足。

use rust_decimal::Decimal;

use matflow_core::profile::ProfileCursor;
use matflow_core::qty;
use matflow_core::{
    AllocationDirection, DemandId, DemandPhase, EligibilityPolicy, NodeArena, SimClock, SupplyId,
};

use crate::supply::SupplyProfile;

/// 分配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// 測試分配：可逆的可行性探測，保留在回傳前全數回滾
    Test,

    /// 正式分配：保留轉為需求與供應節點間的分配連結
    Commit,
}

/// 一次比對呼叫的參數
#[derive(Debug, Clone, Copy)]
pub struct MatchRequest {
    /// 需求數量
    pub qty: Decimal,

    /// 走訪方向
    pub direction: AllocationDirection,

    /// 只允許現有庫存（排除未來的生產與採購）
    pub in_stock_only: bool,

    /// 分配模式
    pub mode: MatchMode,
}

impl MatchRequest {
    /// 創建正式分配請求
    pub fn commit(qty: Decimal) -> Self {
        Self {
            qty,
            direction: AllocationDirection::default(),
            in_stock_only: false,
            mode: MatchMode::Commit,
        }
    }

    /// 創建測試分配請求
    pub fn test(qty: Decimal) -> Self {
        Self {
            mode: MatchMode::Test,
            ..Self::commit(qty)
        }
    }

    /// 建構器模式：設置走訪方向
    pub fn with_direction(mut self, direction: AllocationDirection) -> Self {
        self.direction = direction;
        self
    }

    /// 建構器模式：只允許現有庫存
    pub fn with_in_stock_only(mut self) -> Self {
        self.in_stock_only = true;
        self
    }
}

/// 兩輪走訪，保留可用數量；回傳 (未滿足餘量, 各節點保留清單)。
/// 保留只動 `unallocated_qty`，由呼叫端決定轉正或回滾。
pub(crate) fn reserve_pass(
    arena: &mut NodeArena,
    supply: &SupplyProfile,
    clock: &SimClock,
    policy: &dyn EligibilityPolicy,
    requested: Decimal,
    direction: AllocationDirection,
    in_stock_only: bool,
) -> (Decimal, Vec<(SupplyId, Decimal)>) {
    let mut remaining = qty::snap(requested);
    let mut reserved: Vec<(SupplyId, Decimal)> = Vec::new();
    if qty::approx_zero(remaining) {
        return (Decimal::ZERO, reserved);
    }

    let profile = supply.profile();
    let mut cursor = if direction.is_newest_first() {
        match profile.find_at_or_before(clock.now()) {
            Some(idx) => ProfileCursor::newest_first_from(idx),
            None => return (remaining, reserved),
        }
    } else {
        ProfileCursor::oldest_first()
    };

    for relaxed in [false, true] {
        if relaxed {
            tracing::debug!(remaining = %remaining, "第一輪未滿足，放寬批次限制進行第二輪");
            cursor.restart();
        }

        while let Some(sid) = cursor.next(profile) {
            let node = arena.supply(sid);
            if node.body().removed() {
                continue;
            }
            if in_stock_only && !node.reason().is_on_hand() {
                continue;
            }

            let eligible = match policy.override_eligibility(node) {
                Some(verdict) => verdict,
                None => {
                    policy.usable(node, clock.now())
                        && (policy.lot_matches(node) || (relaxed && policy.lot_satisfied(node)))
                }
            };
            if !eligible {
                continue;
            }

            let available = node.body().unallocated_qty();
            if qty::approx_zero(available) {
                continue;
            }

            let take = available.min(remaining);
            arena.supply_mut(sid).body_mut().reserve(take);
            reserved.push((sid, take));
            remaining = qty::snap(remaining - take);
            if qty::approx_zero(remaining) {
                break;
            }
        }

        if qty::approx_zero(remaining) {
            break;
        }
    }

    (remaining, reserved)
}

/// 回滾一組保留（測試分配結束時使用）
pub(crate) fn rollback(arena: &mut NodeArena, reserved: &[(SupplyId, Decimal)]) {
    for &(sid, take) in reserved {
        arena.supply_mut(sid).body_mut().unreserve(take);
    }
}

/// 將指定數量自供應曲線分配給一個需求節點
///
/// 回傳未滿足的餘量；供應不足時回傳值大於零，不視為錯誤。
pub fn allocate(
    arena: &mut NodeArena,
    supply: &SupplyProfile,
    demand: DemandId,
    clock: &SimClock,
    policy: &dyn EligibilityPolicy,
    request: &MatchRequest,
) -> Decimal {
    let (remaining, reserved) = reserve_pass(
        arena,
        supply,
        clock,
        policy,
        request.qty,
        request.direction,
        request.in_stock_only,
    );

    match request.mode {
        MatchMode::Test => {
            rollback(arena, &reserved);
            if !reserved.is_empty() {
                let node = arena.demand_mut(demand);
                if node.phase() == DemandPhase::Unallocated {
                    node.begin_test();
                }
            }
        }
        MatchMode::Commit => {
            for &(sid, take) in &reserved {
                let supply_node = arena.supply_mut(sid);
                supply_node.body_mut().commit_reservation(take);
                supply_node.add_consumer(demand, take);

                let demand_node = arena.demand_mut(demand);
                demand_node.body_mut().reserve(take);
                demand_node.body_mut().commit_reservation(take);
                demand_node.add_allocation(sid, take);
            }
            if !reserved.is_empty() {
                arena.demand_mut(demand).mark_committed();
            }
        }
    }

    tracing::debug!(
        demand = %demand,
        requested = %request.qty,
        unmet = %remaining,
        nodes = reserved.len(),
        "比對完成"
    );
    remaining
}
