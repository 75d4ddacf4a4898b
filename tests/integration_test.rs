//! 集成測試

use chrono::NaiveDate;
use matflow::alloc::{
    ActivityTiming, DemandProfile, DemandRequirement, MaterialTiming, SupplyProfile,
};
use matflow::core::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn scenario_clock(now: i64) -> SimClock {
    let base = NaiveDate::from_ymd_opt(2025, 11, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    SimClock::at(base, Tick::new(now))
}

fn purchase(arena: &mut NodeArena, supply: &mut SupplyProfile, qty: i64, date: i64) -> SupplyId {
    supply
        .add(
            arena,
            SupplyNode::new(
                FlowReason::purchase_order(Uuid::new_v4()),
                Decimal::from(qty),
                Tick::new(date),
            ),
        )
        .unwrap()
}

fn timing_at(production_start: i64) -> ActivityTiming {
    ActivityTiming {
        setup_start: Tick::new(production_start - 200),
        setup_finish: Tick::new(production_start),
        production_start: Tick::new(production_start),
        production_finish: Tick::new(production_start + 800),
        post_processing_start: None,
        post_processing_finish: None,
        cycle_starts: vec![],
    }
}

#[test]
fn test_oldest_first_allocation_end_to_end() {
    // 場景：需求 100 在 t1000，供應 40 在 t900、80 在 t950，由舊到新

    // 1. 建立供應曲線
    let mut arena = NodeArena::new();
    let mut supply = SupplyProfile::new();
    let s1 = purchase(&mut arena, &mut supply, 40, 900);
    let s2 = purchase(&mut arena, &mut supply, 80, 950);

    // 2. 展開需求曲線：100 個在生產開始 t1000
    let req = DemandRequirement::new(
        FlowReason::activity(Uuid::new_v4()),
        Decimal::from(100),
        MaterialTiming::AtProductionStart,
    );
    let demand = DemandProfile::generate(&mut arena, &req, &timing_at(1000)).unwrap();

    // 3. 執行分配
    let unmet = demand.allocate_from(
        &mut arena,
        &supply,
        &scenario_clock(1000),
        &NoRestrictions,
        AllocationDirection::OldestFirst,
        false,
    );

    // 4. 驗證結果：40 全取、80 取 60，第二節點剩 20，無未滿足
    assert_eq!(unmet, Decimal::ZERO);
    assert_eq!(arena.supply(s1).body().unallocated_qty(), Decimal::ZERO);
    assert_eq!(arena.supply(s2).body().unallocated_qty(), Decimal::from(20));
    assert_eq!(demand.unallocated_qty(&arena), Decimal::ZERO);
    assert_eq!(supply.unallocated_qty(&arena), Decimal::from(20));
}

#[test]
fn test_shortage_fallback_end_to_end() {
    // 場景：同上但供應只有 70，短缺 30 轉短缺分配而非失敗

    let mut arena = NodeArena::new();
    let mut supply = SupplyProfile::new();
    purchase(&mut arena, &mut supply, 40, 900);
    purchase(&mut arena, &mut supply, 30, 950);

    let req = DemandRequirement::new(
        FlowReason::activity(Uuid::new_v4()),
        Decimal::from(100),
        MaterialTiming::AtProductionStart,
    );
    let demand = DemandProfile::generate(&mut arena, &req, &timing_at(1000)).unwrap();

    let unmet = demand.allocate_from(
        &mut arena,
        &supply,
        &scenario_clock(1000),
        &NoRestrictions,
        AllocationDirection::OldestFirst,
        false,
    );
    assert_eq!(unmet, Decimal::from(30));

    // 短缺分配補足餘量
    let inventory = Uuid::new_v4();
    let covered = demand.allocate_shortage(&mut arena, Tick::new(5000), inventory);
    assert_eq!(covered, Decimal::from(30));
    assert_eq!(demand.unallocated_qty(&arena), Decimal::ZERO);
    assert!(demand.source_inventories(&arena).contains(&inventory));
}

#[test]
fn test_consume_conserves_quantity() {
    // 場景：分配後消耗，驗證守恆
    // Σ current == Σ original − Σ 已消耗；分配本身不動 current

    let mut arena = NodeArena::new();
    let mut supply = SupplyProfile::new();
    purchase(&mut arena, &mut supply, 60, 100);
    purchase(&mut arena, &mut supply, 60, 300);

    let req = DemandRequirement::new(
        FlowReason::activity(Uuid::new_v4()),
        Decimal::from(100),
        MaterialTiming::DuringSetup,
    );
    // 換線 t800–t1000：兩批各 50
    let demand = DemandProfile::generate(&mut arena, &req, &timing_at(1000)).unwrap();
    assert_eq!(demand.node_count(), 2);

    let unmet = demand.allocate_from(
        &mut arena,
        &supply,
        &scenario_clock(1000),
        &NoRestrictions,
        AllocationDirection::OldestFirst,
        false,
    );
    assert_eq!(unmet, Decimal::ZERO);

    // 分配不改變 current
    assert_eq!(supply.remaining_qty(&arena), Decimal::from(120));
    assert_eq!(supply.total_qty(&arena), Decimal::from(120));

    // 消耗後守恆
    let mut events = EventSink::new();
    let adjustments = demand.consume_allocations(&mut arena, &scenario_clock(1000), &mut events);
    let consumed: Decimal = adjustments.iter().map(|a| a.qty).sum();
    assert_eq!(consumed, Decimal::from(100));
    assert_eq!(
        supply.remaining_qty(&arena),
        supply.total_qty(&arena) - consumed
    );
    assert_eq!(demand.remaining_qty(&arena), Decimal::ZERO);

    // 第一個供應節點耗盡，排入棄置檢查
    assert!(events
        .iter()
        .any(|e| matches!(e.kind, FutureEventKind::DisposalCheck { .. })));
}

#[test]
fn test_transfer_between_inventories() {
    // 場景：供應曲線在兩個庫存間轉移一段區間

    let mut arena = NodeArena::new();
    let mut warehouse_a = SupplyProfile::new();
    let mut warehouse_b = SupplyProfile::new();
    purchase(&mut arena, &mut warehouse_b, 40, 100);
    purchase(&mut arena, &mut warehouse_b, 60, 200);
    purchase(&mut arena, &mut warehouse_b, 30, 300);

    let moved = warehouse_a.transfer_range(&arena, &mut warehouse_b, Tick::new(100), Tick::new(200));

    // 區間內的 100 被轉移，來源曲線不再持有
    assert_eq!(moved, Decimal::from(100));
    assert_eq!(warehouse_a.total_qty(&arena), Decimal::from(100));
    assert_eq!(warehouse_b.total_qty(&arena), Decimal::from(30));

    // 轉移後的曲線可以直接分配
    let d = arena.insert_demand(DemandNode::new(
        FlowReason::sales_line(Uuid::new_v4()),
        Decimal::from(50),
        Tick::new(400),
    ));
    let unmet = matflow::alloc::allocate(
        &mut arena,
        &warehouse_a,
        d,
        &scenario_clock(400),
        &NoRestrictions,
        &matflow::alloc::MatchRequest::commit(Decimal::from(50)),
    );
    assert_eq!(unmet, Decimal::ZERO);
}

#[test]
fn test_lead_time_then_shortage_pipeline() {
    // 場景：每週期投料，先比對、再提前期回退、最後短缺分配，
    // 三段結束後需求全數滿足

    let mut arena = NodeArena::new();
    let mut supply = SupplyProfile::new();
    purchase(&mut arena, &mut supply, 30, 100);

    let mut timing = timing_at(1000);
    timing.cycle_starts = vec![
        Tick::new(1000),
        Tick::new(1200),
        Tick::new(1400),
        Tick::new(1600),
    ];
    let req = DemandRequirement::new(
        FlowReason::activity(Uuid::new_v4()),
        Decimal::from(100),
        MaterialTiming::PerCycle,
    );
    let demand = DemandProfile::generate(&mut arena, &req, &timing).unwrap();

    // 1. 正常比對：30 可分配
    let unmet = demand.allocate_from(
        &mut arena,
        &supply,
        &scenario_clock(1600),
        &NoRestrictions,
        AllocationDirection::OldestFirst,
        false,
    );
    assert_eq!(unmet, Decimal::from(70));

    // 2. 提前期回退：t1400 之後的節點自指定庫存強制滿足
    let inventory = Uuid::new_v4();
    let lead_covered =
        demand.allocate_remaining_from_lead_time(&mut arena, Tick::new(1400), inventory);
    assert_eq!(lead_covered, Decimal::from(50));

    // 3. 其餘轉短缺分配
    let short_covered = demand.allocate_shortage(&mut arena, Tick::new(2000), inventory);
    assert_eq!(short_covered, Decimal::from(20));
    assert_eq!(demand.unallocated_qty(&arena), Decimal::ZERO);
}
