//! 需求曲線
//!
//! 將物料需求的投料時機政策展開為時序需求節點，
//! 對供應曲線進行分配，並在模擬時鐘推進後把分配轉為實際扣減。
//!
//! 供應不足時的回退順序由呼叫端決定：提前期分配、短缺分配，
//! 或維持未滿足。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use matflow_core::qty;
use matflow_core::{
    AllocationDirection, DemandId, DemandNode, DemandPhase, EligibilityPolicy, EventSink,
    FlowReason, FutureEventKind, NodeArena, QuantityProfile, Result, SimClock, SupplyId, Tick,
};

use crate::matching::{self, MatchRequest};
use crate::supply::SupplyProfile;

/// 投料時機政策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialTiming {
    /// 換線開始時一次投入
    AtSetupStart,

    /// 換線期間分兩批投入（開始與結束各半）
    DuringSetup,

    /// 生產開始時一次投入
    AtProductionStart,

    /// 每個生產週期投入一批
    PerCycle,

    /// 首尾週期各投入一半
    FirstAndLastCycle,

    /// 後處理開始時投入
    AtPostProcessingStart,

    /// 後處理結束時投入
    AtPostProcessingEnd,
}

/// 活動排程時刻（由排程子系統計算後傳入）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTiming {
    /// 換線開始
    pub setup_start: Tick,

    /// 換線結束
    pub setup_finish: Tick,

    /// 生產開始
    pub production_start: Tick,

    /// 生產結束
    pub production_finish: Tick,

    /// 後處理開始（無後處理時為 `None`）
    pub post_processing_start: Option<Tick>,

    /// 後處理結束
    pub post_processing_finish: Option<Tick>,

    /// 各週期開始時刻（遞增）
    pub cycle_starts: Vec<Tick>,
}

impl ActivityTiming {
    /// 後處理開始時刻；無後處理時以生產結束代替
    fn post_processing_start_or_finish(&self) -> Tick {
        self.post_processing_start.unwrap_or(self.production_finish)
    }

    /// 後處理結束時刻；無後處理時以生產結束代替
    fn post_processing_finish_or_finish(&self) -> Tick {
        self.post_processing_finish
            .unwrap_or(self.production_finish)
    }
}

/// 物料需求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandRequirement {
    /// 需求來源
    pub reason: FlowReason,

    /// 需求總數量
    pub total_qty: Decimal,

    /// 已於模擬外發料的數量
    pub issued_qty: Decimal,

    /// 投料時機
    pub timing: MaterialTiming,

    /// 最小搬運量（每批投料不得低於此值，最終餘量除外）
    pub min_transfer_qty: Option<Decimal>,

    /// 是否允許跨倉供應
    pub allow_multi_warehouse: bool,
}

impl DemandRequirement {
    /// 創建新的物料需求
    pub fn new(reason: FlowReason, total_qty: Decimal, timing: MaterialTiming) -> Self {
        Self {
            reason,
            total_qty,
            issued_qty: Decimal::ZERO,
            timing,
            min_transfer_qty: None,
            allow_multi_warehouse: true,
        }
    }

    /// 建構器模式：設置已發料數量
    pub fn with_issued_qty(mut self, issued: Decimal) -> Self {
        self.issued_qty = issued;
        self
    }

    /// 建構器模式：設置最小搬運量
    pub fn with_min_transfer_qty(mut self, min: Decimal) -> Self {
        self.min_transfer_qty = Some(min);
        self
    }

    /// 建構器模式：禁止跨倉供應
    pub fn without_multi_warehouse(mut self) -> Self {
        self.allow_multi_warehouse = false;
        self
    }

    /// 扣除已發料後的未滿足數量
    pub fn outstanding_qty(&self) -> Decimal {
        let outstanding = qty::snap(self.total_qty - self.issued_qty);
        if outstanding < Decimal::ZERO {
            Decimal::ZERO
        } else {
            outstanding
        }
    }
}

/// 消耗時產生的調整記錄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// 供應節點
    pub supply: SupplyId,

    /// 需求節點
    pub demand: DemandId,

    /// 扣減數量
    pub qty: Decimal,

    /// 扣減時刻
    pub at: Tick,
}

/// 需求曲線
#[derive(Debug)]
pub struct DemandProfile {
    profile: QuantityProfile<DemandId>,
    allow_multi_warehouse: bool,
}

impl DemandProfile {
    /// 依投料時機政策展開需求節點
    ///
    /// 節點總量等於需求的未滿足數量；已全數發料時不產生任何節點。
    pub fn generate(
        arena: &mut NodeArena,
        requirement: &DemandRequirement,
        timing: &ActivityTiming,
    ) -> Result<Self> {
        let mut profile = Self {
            profile: QuantityProfile::new(),
            allow_multi_warehouse: requirement.allow_multi_warehouse,
        };

        let outstanding = requirement.outstanding_qty();
        if qty::approx_zero(outstanding) {
            return Ok(profile);
        }

        match requirement.timing {
            MaterialTiming::AtSetupStart => {
                profile.push_node(arena, requirement.reason, outstanding, timing.setup_start)?;
            }
            MaterialTiming::DuringSetup => {
                let first = outstanding / Decimal::TWO;
                let second = qty::snap(outstanding - first);
                profile.push_node(arena, requirement.reason, first, timing.setup_start)?;
                profile.push_node(arena, requirement.reason, second, timing.setup_finish)?;
            }
            MaterialTiming::AtProductionStart => {
                profile.push_node(
                    arena,
                    requirement.reason,
                    outstanding,
                    timing.production_start,
                )?;
            }
            MaterialTiming::PerCycle => {
                profile.generate_per_cycle(arena, requirement, timing, outstanding)?;
            }
            MaterialTiming::FirstAndLastCycle => {
                let (first_at, last_at) = match (
                    timing.cycle_starts.first(),
                    timing.cycle_starts.last(),
                ) {
                    (Some(first), Some(last)) => (*first, *last),
                    _ => (timing.production_start, timing.production_finish),
                };
                let first = outstanding / Decimal::TWO;
                let second = qty::snap(outstanding - first);
                profile.push_node(arena, requirement.reason, first, first_at)?;
                profile.push_node(arena, requirement.reason, second, last_at)?;
            }
            MaterialTiming::AtPostProcessingStart => {
                profile.push_node(
                    arena,
                    requirement.reason,
                    outstanding,
                    timing.post_processing_start_or_finish(),
                )?;
            }
            MaterialTiming::AtPostProcessingEnd => {
                profile.push_node(
                    arena,
                    requirement.reason,
                    outstanding,
                    timing.post_processing_finish_or_finish(),
                )?;
            }
        }

        tracing::debug!(
            nodes = profile.node_count(),
            total = %outstanding,
            "需求曲線展開完成"
        );
        Ok(profile)
    }

    /// 每週期投料：每批不低於最小搬運量（最終餘量除外），
    /// 週期用盡時餘量併入最後一批
    fn generate_per_cycle(
        &mut self,
        arena: &mut NodeArena,
        requirement: &DemandRequirement,
        timing: &ActivityTiming,
        outstanding: Decimal,
    ) -> Result<()> {
        let cycles = &timing.cycle_starts;
        if cycles.is_empty() {
            return self.push_node(arena, requirement.reason, outstanding, timing.production_start);
        }
        debug_assert!(
            cycles.windows(2).all(|w| w[0] <= w[1]),
            "週期開始時刻必須遞增"
        );

        let per_cycle = outstanding / Decimal::from(cycles.len() as u64);
        let chunk = match requirement.min_transfer_qty {
            Some(min) if per_cycle < min => min,
            _ => per_cycle,
        };

        let mut remaining = outstanding;
        for (i, at) in cycles.iter().enumerate() {
            if qty::approx_zero(remaining) {
                break;
            }
            // 最後一個週期吸收全部餘量
            let take = if i + 1 == cycles.len() {
                remaining
            } else {
                chunk.min(remaining)
            };
            self.push_node(arena, requirement.reason, take, *at)?;
            remaining = qty::snap(remaining - take);
        }
        Ok(())
    }

    fn push_node(
        &mut self,
        arena: &mut NodeArena,
        reason: FlowReason,
        node_qty: Decimal,
        date: Tick,
    ) -> Result<()> {
        let id = arena.insert_demand(DemandNode::new(reason, node_qty, date));
        self.profile.push_back(date, id)
    }

    /// 底層時序曲線
    pub fn profile(&self) -> &QuantityProfile<DemandId> {
        &self.profile
    }

    pub fn node_count(&self) -> usize {
        self.profile.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_empty()
    }

    /// 需求總數量
    pub fn total_qty(&self, arena: &NodeArena) -> Decimal {
        qty::snap(
            self.profile
                .iter_nodes()
                .map(|(_, id)| arena.demand(id).body().original_qty())
                .sum(),
        )
    }

    /// 尚未分配的數量
    pub fn unallocated_qty(&self, arena: &NodeArena) -> Decimal {
        qty::snap(
            self.profile
                .iter_nodes()
                .map(|(_, id)| arena.demand(id).body().unallocated_qty())
                .sum(),
        )
    }

    /// 扣除消耗後的剩餘數量
    pub fn remaining_qty(&self, arena: &NodeArena) -> Decimal {
        qty::snap(
            self.profile
                .iter_nodes()
                .map(|(_, id)| arena.demand(id).body().current_qty())
                .sum(),
        )
    }

    /// 分配回合開始前重設所有節點
    pub fn reset_for_allocation(&self, arena: &mut NodeArena) {
        for (_, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            arena.demand_mut(id).body_mut().reset_for_allocation();
        }
    }

    /// 拆下節點並標記移除；桶變空時一併移除
    pub fn remove(&mut self, arena: &mut NodeArena, id: DemandId) -> bool {
        let date = match arena.demand(id).body().date() {
            Some(d) => d,
            None => return false,
        };
        let removed = self.profile.remove(date, id);
        if removed {
            arena.demand_mut(id).body_mut().mark_removed();
        }
        removed
    }

    /// 清空曲線，所有節點標記移除（放棄模擬分支時使用）
    pub fn clear(&mut self, arena: &mut NodeArena) {
        for id in self.profile.clear() {
            arena.demand_mut(id).body_mut().mark_removed();
        }
    }

    /// 由舊到新對每個節點進行正式分配；回傳未滿足的總餘量
    pub fn allocate_from(
        &self,
        arena: &mut NodeArena,
        supply: &SupplyProfile,
        clock: &SimClock,
        policy: &dyn EligibilityPolicy,
        direction: AllocationDirection,
        in_stock_only: bool,
    ) -> Decimal {
        let mut unmet = Decimal::ZERO;
        for (_, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            let needed = arena.demand(id).body().unallocated_qty();
            if qty::approx_zero(needed) {
                continue;
            }
            let mut request = MatchRequest::commit(needed).with_direction(direction);
            if in_stock_only {
                request = request.with_in_stock_only();
            }
            unmet += matching::allocate(arena, supply, id, clock, policy, &request);
        }
        qty::snap(unmet)
    }

    /// 測試分配：可行性探測，保留在回傳前全數回滾
    pub fn test_allocate_from(
        &self,
        arena: &mut NodeArena,
        supply: &SupplyProfile,
        clock: &SimClock,
        policy: &dyn EligibilityPolicy,
        direction: AllocationDirection,
        in_stock_only: bool,
    ) -> Decimal {
        let mut unmet = Decimal::ZERO;
        let mut all_reserved: Vec<(SupplyId, Decimal)> = Vec::new();

        for (_, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            let needed = arena.demand(id).body().unallocated_qty();
            if qty::approx_zero(needed) {
                continue;
            }
            let (remaining, reserved) = matching::reserve_pass(
                arena,
                supply,
                clock,
                policy,
                needed,
                direction,
                in_stock_only,
            );
            unmet += remaining;
            if !reserved.is_empty() {
                let node = arena.demand_mut(id);
                if node.phase() == DemandPhase::Unallocated {
                    node.begin_test();
                }
                all_reserved.extend(reserved);
            }
        }

        matching::rollback(arena, &all_reserved);
        qty::snap(unmet)
    }

    /// 提前期回退：需求時刻不早於提前期門檻的節點
    /// 視為提前期過後即可自指定庫存取得，強制滿足。
    ///
    /// 禁止跨倉時，遇到第一個不適用的節點即停止
    /// （節點依時刻遞增，其後的節點視為同樣不適用）。
    pub fn allocate_remaining_from_lead_time(
        &self,
        arena: &mut NodeArena,
        threshold: Tick,
        inventory: Uuid,
    ) -> Decimal {
        let mut covered = Decimal::ZERO;
        for (date, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            let needed = arena.demand(id).body().unallocated_qty();
            if qty::approx_zero(needed) {
                continue;
            }
            if date < threshold {
                if !self.allow_multi_warehouse {
                    break;
                }
                continue;
            }
            let node = arena.demand_mut(id);
            node.body_mut().reserve(needed);
            node.body_mut().commit_reservation(needed);
            node.set_lead_time_allocation(inventory, needed);
            node.mark_committed();
            covered += needed;
        }
        let covered = qty::snap(covered);
        if !qty::approx_zero(covered) {
            tracing::debug!(covered = %covered, threshold = %threshold, "提前期回退完成");
        }
        covered
    }

    /// 計劃時界回退：需求時刻落在時界之後的節點
    /// 以短缺分配強制滿足，並標記超出時界。
    ///
    /// 禁止跨倉時的提前停止規則與提前期回退相同。
    pub fn allocate_remaining_from_past_horizon(
        &self,
        arena: &mut NodeArena,
        horizon_end: Tick,
        inventory: Uuid,
    ) -> Decimal {
        let mut covered = Decimal::ZERO;
        for (date, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            let needed = arena.demand(id).body().unallocated_qty();
            if qty::approx_zero(needed) {
                continue;
            }
            if date <= horizon_end {
                if !self.allow_multi_warehouse {
                    break;
                }
                continue;
            }
            let node = arena.demand_mut(id);
            node.body_mut().reserve(needed);
            node.body_mut().commit_reservation(needed);
            node.set_shortage_allocation(inventory, needed, true);
            node.mark_committed();
            covered += needed;
        }
        qty::snap(covered)
    }

    /// 短缺分配：對所有仍未滿足的節點自指定庫存強制滿足
    pub fn allocate_shortage(
        &self,
        arena: &mut NodeArena,
        horizon_end: Tick,
        inventory: Uuid,
    ) -> Decimal {
        let mut covered = Decimal::ZERO;
        for (date, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            let needed = arena.demand(id).body().unallocated_qty();
            if qty::approx_zero(needed) {
                continue;
            }
            let node = arena.demand_mut(id);
            node.body_mut().reserve(needed);
            node.body_mut().commit_reservation(needed);
            node.set_shortage_allocation(inventory, needed, date > horizon_end);
            node.mark_committed();
            covered += needed;
        }
        let covered = qty::snap(covered);
        if !qty::approx_zero(covered) {
            tracing::info!(covered = %covered, "短缺分配完成");
        }
        covered
    }

    /// 將不晚於模擬時鐘的節點的分配轉為實際扣減
    ///
    /// 供需兩側的 `current_qty` 同步遞減；供應節點耗盡時排入
    /// 棄置檢查與儲區釋放事件。已消耗的節點不再處理。
    pub fn consume_allocations(
        &self,
        arena: &mut NodeArena,
        clock: &SimClock,
        events: &mut EventSink,
    ) -> Vec<Adjustment> {
        let mut adjustments = Vec::new();

        for (date, id) in self.profile.iter_nodes().collect::<Vec<_>>() {
            if date > clock.now() {
                break;
            }
            if arena.demand(id).phase() != DemandPhase::Committed {
                continue;
            }

            let allocations: Vec<_> = arena.demand(id).allocations().to_vec();
            for alloc in allocations {
                let supply_node = arena.supply_mut(alloc.supply);
                supply_node.body_mut().consume(alloc.qty);
                arena.demand_mut(id).body_mut().consume(alloc.qty);
                adjustments.push(Adjustment {
                    supply: alloc.supply,
                    demand: id,
                    qty: alloc.qty,
                    at: date,
                });

                let supply_node = arena.supply(alloc.supply);
                if qty::approx_zero(supply_node.body().current_qty()) {
                    events.schedule(date, FutureEventKind::DisposalCheck { supply: alloc.supply });
                    for storage in supply_node.storage_allocations() {
                        events.schedule(date, FutureEventKind::StorageRelease { area: storage.area });
                    }
                }
            }

            let node = arena.demand_mut(id);
            let lead = node.lead_time_allocation().map(|a| a.qty);
            let short = node.shortage_allocation().map(|a| a.qty);
            if let Some(q) = lead {
                node.body_mut().consume(q);
            }
            if let Some(q) = short {
                node.body_mut().consume(q);
            }
            node.mark_consumed();
        }

        tracing::debug!(
            now = %clock.now(),
            adjustments = adjustments.len(),
            "分配消耗完成"
        );
        adjustments
    }

    /// 最後一筆分配來源的可用時刻
    pub fn latest_allocation_date(&self, arena: &NodeArena) -> Option<Tick> {
        let mut latest: Option<Tick> = None;
        for (_, id) in self.profile.iter_nodes() {
            for alloc in arena.demand(id).allocations() {
                if let Some(available) = arena.supply(alloc.supply).available_date() {
                    latest = Some(latest.map_or(available, |t| t.max(available)));
                }
            }
        }
        latest
    }

    /// 物料來源的庫存集合（含提前期與短缺分配的指定庫存）
    pub fn source_inventories(&self, arena: &NodeArena) -> BTreeSet<Uuid> {
        let mut sources = BTreeSet::new();
        for (_, id) in self.profile.iter_nodes() {
            let node = arena.demand(id);
            for alloc in node.allocations() {
                let reason = arena.supply(alloc.supply).reason();
                if reason.is_on_hand() {
                    sources.insert(reason.id());
                }
            }
            if let Some(lead) = node.lead_time_allocation() {
                sources.insert(lead.inventory);
            }
            if let Some(short) = node.shortage_allocation() {
                sources.insert(short.inventory);
            }
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use matflow_core::{NoRestrictions, SupplyNode};
    use rstest::rstest;

    fn clock_at(now: i64) -> SimClock {
        let base = NaiveDate::from_ymd_opt(2025, 11, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        SimClock::at(base, Tick::new(now))
    }

    fn timing() -> ActivityTiming {
        ActivityTiming {
            setup_start: Tick::new(100),
            setup_finish: Tick::new(200),
            production_start: Tick::new(200),
            production_finish: Tick::new(1000),
            post_processing_start: Some(Tick::new(1000)),
            post_processing_finish: Some(Tick::new(1200)),
            cycle_starts: vec![
                Tick::new(200),
                Tick::new(400),
                Tick::new(600),
                Tick::new(800),
            ],
        }
    }

    fn requirement(total: i64, material_timing: MaterialTiming) -> DemandRequirement {
        DemandRequirement::new(
            FlowReason::activity(Uuid::new_v4()),
            Decimal::from(total),
            material_timing,
        )
    }

    fn node_qtys(arena: &NodeArena, profile: &DemandProfile) -> Vec<(i64, Decimal)> {
        profile
            .profile()
            .iter_nodes()
            .map(|(t, id)| (t.value(), arena.demand(id).body().original_qty()))
            .collect()
    }

    #[rstest]
    #[case(MaterialTiming::AtSetupStart, vec![(100, 100)])]
    #[case(MaterialTiming::DuringSetup, vec![(100, 50), (200, 50)])]
    #[case(MaterialTiming::AtProductionStart, vec![(200, 100)])]
    #[case(MaterialTiming::FirstAndLastCycle, vec![(200, 50), (800, 50)])]
    #[case(MaterialTiming::AtPostProcessingStart, vec![(1000, 100)])]
    #[case(MaterialTiming::AtPostProcessingEnd, vec![(1200, 100)])]
    fn test_generate_by_timing(
        #[case] material_timing: MaterialTiming,
        #[case] expected: Vec<(i64, i64)>,
    ) {
        let mut arena = NodeArena::new();
        let profile =
            DemandProfile::generate(&mut arena, &requirement(100, material_timing), &timing())
                .unwrap();

        let expected: Vec<(i64, Decimal)> = expected
            .into_iter()
            .map(|(t, q)| (t, Decimal::from(q)))
            .collect();
        assert_eq!(node_qtys(&arena, &profile), expected);
        assert_eq!(profile.total_qty(&arena), Decimal::from(100));
    }

    #[test]
    fn test_per_cycle_even_split() {
        let mut arena = NodeArena::new();
        let profile =
            DemandProfile::generate(&mut arena, &requirement(100, MaterialTiming::PerCycle), &timing())
                .unwrap();

        // 100 / 4 週期 = 每批 25
        assert_eq!(
            node_qtys(&arena, &profile),
            vec![
                (200, Decimal::from(25)),
                (400, Decimal::from(25)),
                (600, Decimal::from(25)),
                (800, Decimal::from(25)),
            ]
        );
    }

    #[test]
    fn test_per_cycle_min_transfer_qty() {
        let mut arena = NodeArena::new();
        let req = requirement(100, MaterialTiming::PerCycle)
            .with_min_transfer_qty(Decimal::from(30));
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();

        // 每批提高到最小搬運量 30，最終餘量 10 自成一批
        assert_eq!(
            node_qtys(&arena, &profile),
            vec![
                (200, Decimal::from(30)),
                (400, Decimal::from(30)),
                (600, Decimal::from(30)),
                (800, Decimal::from(10)),
            ]
        );
        assert_eq!(profile.total_qty(&arena), Decimal::from(100));
    }

    #[test]
    fn test_per_cycle_last_absorbs_remainder() {
        let mut arena = NodeArena::new();
        let mut t = timing();
        t.cycle_starts = vec![Tick::new(200), Tick::new(400), Tick::new(600)];
        let profile =
            DemandProfile::generate(&mut arena, &requirement(100, MaterialTiming::PerCycle), &t)
                .unwrap();

        // 100 / 3 無法整除：最後一批吸收餘量，總量守恆
        assert_eq!(profile.node_count(), 3);
        assert_eq!(profile.total_qty(&arena), Decimal::from(100));
    }

    #[test]
    fn test_issued_qty_short_circuits() {
        let mut arena = NodeArena::new();
        let req = requirement(100, MaterialTiming::AtProductionStart)
            .with_issued_qty(Decimal::from(100));
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();

        assert!(profile.is_empty());

        // 部分發料：只展開未滿足的部分
        let req = requirement(100, MaterialTiming::AtProductionStart)
            .with_issued_qty(Decimal::from(30));
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();
        assert_eq!(profile.total_qty(&arena), Decimal::from(70));
    }

    #[test]
    fn test_remove_marks_node() {
        let mut arena = NodeArena::new();
        let req = requirement(100, MaterialTiming::DuringSetup);
        let mut profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();
        let (_, id) = profile.profile().iter_nodes().next().unwrap();

        assert!(profile.remove(&mut arena, id));
        assert!(arena.demand(id).body().removed());
        assert_eq!(profile.node_count(), 1);
        assert_eq!(profile.total_qty(&arena), Decimal::from(50));
        assert!(!profile.remove(&mut arena, id));
    }

    #[test]
    fn test_clear_detaches_all() {
        let mut arena = NodeArena::new();
        let req = requirement(100, MaterialTiming::PerCycle);
        let mut profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();
        let ids: Vec<_> = profile.profile().iter_nodes().map(|(_, id)| id).collect();

        // 放棄模擬分支：曲線清空，節點全數標記移除
        profile.clear(&mut arena);
        assert!(profile.is_empty());
        for id in ids {
            assert!(arena.demand(id).body().removed());
        }
    }

    #[test]
    fn test_allocate_then_shortage_fallback() {
        // 需求 100，供應僅 70：先分配 70，餘 30 轉短缺分配
        let mut arena = NodeArena::new();
        let mut supply = SupplyProfile::new();
        supply
            .add(
                &mut arena,
                SupplyNode::new(
                    FlowReason::purchase_order(Uuid::new_v4()),
                    Decimal::from(40),
                    Tick::new(900),
                ),
            )
            .unwrap();
        supply
            .add(
                &mut arena,
                SupplyNode::new(
                    FlowReason::purchase_order(Uuid::new_v4()),
                    Decimal::from(30),
                    Tick::new(950),
                ),
            )
            .unwrap();

        let mut t = timing();
        t.production_start = Tick::new(1000);
        let req = requirement(100, MaterialTiming::AtProductionStart);
        let profile = DemandProfile::generate(&mut arena, &req, &t).unwrap();

        let unmet = profile.allocate_from(
            &mut arena,
            &supply,
            &clock_at(1000),
            &NoRestrictions,
            AllocationDirection::OldestFirst,
            false,
        );
        assert_eq!(unmet, Decimal::from(30));

        let inventory = Uuid::new_v4();
        let covered = profile.allocate_shortage(&mut arena, Tick::new(2000), inventory);
        assert_eq!(covered, Decimal::from(30));
        assert_eq!(profile.unallocated_qty(&arena), Decimal::ZERO);

        let (_, id) = profile.profile().iter_nodes().next().unwrap();
        let shortage = arena.demand(id).shortage_allocation().unwrap();
        assert_eq!(shortage.qty, Decimal::from(30));
        assert!(!shortage.past_planning_horizon);
        assert!(profile.source_inventories(&arena).contains(&inventory));
    }

    #[test]
    fn test_lead_time_fallback_threshold() {
        let mut arena = NodeArena::new();
        let req = requirement(100, MaterialTiming::PerCycle);
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();

        // 門檻 500：時刻 600、800 的節點適用，200、400 維持未滿足
        let inventory = Uuid::new_v4();
        let covered =
            profile.allocate_remaining_from_lead_time(&mut arena, Tick::new(500), inventory);
        assert_eq!(covered, Decimal::from(50));
        assert_eq!(profile.unallocated_qty(&arena), Decimal::from(50));
    }

    #[test]
    fn test_lead_time_fallback_breaks_without_multi_warehouse() {
        let mut arena = NodeArena::new();
        let req = requirement(100, MaterialTiming::PerCycle).without_multi_warehouse();
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();

        // 禁止跨倉：第一個不適用的節點（時刻 200）即停止，
        // 其後適用的節點也不處理
        let covered = profile.allocate_remaining_from_lead_time(
            &mut arena,
            Tick::new(500),
            Uuid::new_v4(),
        );
        assert_eq!(covered, Decimal::ZERO);
        assert_eq!(profile.unallocated_qty(&arena), Decimal::from(100));
    }

    #[test]
    fn test_past_horizon_fallback() {
        let mut arena = NodeArena::new();
        let req = requirement(100, MaterialTiming::PerCycle);
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();

        // 時界 600：只有時刻 800 的節點超出
        let covered = profile.allocate_remaining_from_past_horizon(
            &mut arena,
            Tick::new(600),
            Uuid::new_v4(),
        );
        assert_eq!(covered, Decimal::from(25));

        let past: Vec<_> = profile
            .profile()
            .iter_nodes()
            .filter_map(|(_, id)| arena.demand(id).shortage_allocation())
            .collect();
        assert_eq!(past.len(), 1);
        assert!(past[0].past_planning_horizon);
    }

    #[test]
    fn test_test_allocate_rolls_back_everything() {
        let mut arena = NodeArena::new();
        let mut supply = SupplyProfile::new();
        let sid = supply
            .add(
                &mut arena,
                SupplyNode::new(
                    FlowReason::purchase_order(Uuid::new_v4()),
                    Decimal::from(80),
                    Tick::new(100),
                ),
            )
            .unwrap();

        let req = requirement(100, MaterialTiming::PerCycle);
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();

        let unmet = profile.test_allocate_from(
            &mut arena,
            &supply,
            &clock_at(1000),
            &NoRestrictions,
            AllocationDirection::OldestFirst,
            false,
        );
        assert_eq!(unmet, Decimal::from(20));

        // 供應側全數回滾，需求側僅階段進入測試分配
        assert_eq!(arena.supply(sid).body().unallocated_qty(), Decimal::from(80));
        for (_, id) in profile.profile().iter_nodes() {
            assert!(arena.demand(id).allocations().is_empty());
        }
    }

    #[test]
    fn test_consume_allocations_decrements_and_schedules() {
        let mut arena = NodeArena::new();
        let mut supply = SupplyProfile::new();
        let sid = supply
            .add(
                &mut arena,
                SupplyNode::new(
                    FlowReason::purchase_order(Uuid::new_v4()),
                    Decimal::from(100),
                    Tick::new(100),
                ),
            )
            .unwrap();

        let req = requirement(100, MaterialTiming::PerCycle);
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();
        let unmet = profile.allocate_from(
            &mut arena,
            &supply,
            &clock_at(1000),
            &NoRestrictions,
            AllocationDirection::OldestFirst,
            false,
        );
        assert_eq!(unmet, Decimal::ZERO);

        // 時鐘 500：只有時刻 200、400 的節點消耗
        let mut events = EventSink::new();
        let adjustments = profile.consume_allocations(&mut arena, &clock_at(500), &mut events);
        assert_eq!(adjustments.len(), 2);
        assert_eq!(arena.supply(sid).body().current_qty(), Decimal::from(50));
        assert_eq!(profile.remaining_qty(&arena), Decimal::from(50));
        assert!(events.is_empty());

        // 時鐘推進到尾端：其餘節點消耗，供應耗盡排入棄置檢查
        let adjustments = profile.consume_allocations(&mut arena, &clock_at(1000), &mut events);
        assert_eq!(adjustments.len(), 2);
        assert_eq!(arena.supply(sid).body().current_qty(), Decimal::ZERO);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events.iter().next().unwrap().kind,
            FutureEventKind::DisposalCheck { supply } if supply == sid
        ));

        // 再次呼叫：節點已消耗，不再處理
        let adjustments = profile.consume_allocations(&mut arena, &clock_at(1000), &mut events);
        assert!(adjustments.is_empty());
    }

    #[test]
    fn test_summaries() {
        let mut arena = NodeArena::new();
        let mut supply = SupplyProfile::new();
        let inventory_id = Uuid::new_v4();
        supply
            .add(
                &mut arena,
                SupplyNode::new(
                    FlowReason::inventory_lot(inventory_id, Uuid::new_v4()),
                    Decimal::from(60),
                    Tick::new(100),
                ),
            )
            .unwrap();
        supply
            .add(
                &mut arena,
                SupplyNode::new(
                    FlowReason::purchase_order(Uuid::new_v4()),
                    Decimal::from(40),
                    Tick::new(300),
                ),
            )
            .unwrap();

        let req = requirement(100, MaterialTiming::AtPostProcessingEnd);
        let profile = DemandProfile::generate(&mut arena, &req, &timing()).unwrap();
        profile.allocate_from(
            &mut arena,
            &supply,
            &clock_at(1200),
            &NoRestrictions,
            AllocationDirection::OldestFirst,
            false,
        );

        assert_eq!(profile.latest_allocation_date(&arena), Some(Tick::new(300)));

        // 只有現有庫存計入來源庫存集合
        let sources = profile.source_inventories(&arena);
        assert_eq!(sources.len(), 1);
        assert!(sources.contains(&inventory_id));
    }
}
