//! 節點儲存區
//!
//! 節點集中存放於情境層級的儲存區，曲線與分配記錄只持有
//! 穩定的索引代號。桶之間的合併與轉移只搬動索引，
//! 節點本身不移動，索引在整個情境生命週期內有效。

use serde::{Deserialize, Serialize};

use crate::node::{DemandNode, SupplyNode};

/// 供應節點代號
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupplyId(u32);

impl SupplyId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        SupplyId(raw)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SupplyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// 需求節點代號
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DemandId(u32);

impl DemandId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        DemandId(raw)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for DemandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// 情境層級的節點儲存區
#[derive(Debug, Default)]
pub struct NodeArena {
    supply: Vec<SupplyNode>,
    demand: Vec<DemandNode>,
}

impl NodeArena {
    /// 創建空的儲存區
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入供應節點，回傳代號
    pub fn insert_supply(&mut self, node: SupplyNode) -> SupplyId {
        let id = SupplyId(self.supply.len() as u32);
        self.supply.push(node);
        id
    }

    /// 放入需求節點，回傳代號
    pub fn insert_demand(&mut self, node: DemandNode) -> DemandId {
        let id = DemandId(self.demand.len() as u32);
        self.demand.push(node);
        id
    }

    pub fn supply(&self, id: SupplyId) -> &SupplyNode {
        &self.supply[id.index()]
    }

    pub fn supply_mut(&mut self, id: SupplyId) -> &mut SupplyNode {
        &mut self.supply[id.index()]
    }

    pub fn demand(&self, id: DemandId) -> &DemandNode {
        &self.demand[id.index()]
    }

    pub fn demand_mut(&mut self, id: DemandId) -> &mut DemandNode {
        &mut self.demand[id.index()]
    }

    pub fn supply_count(&self) -> usize {
        self.supply.len()
    }

    pub fn demand_count(&self) -> usize {
        self.demand.len()
    }

    pub fn iter_supply(&self) -> impl Iterator<Item = (SupplyId, &SupplyNode)> {
        self.supply
            .iter()
            .enumerate()
            .map(|(i, n)| (SupplyId(i as u32), n))
    }

    pub fn iter_demand(&self) -> impl Iterator<Item = (DemandId, &DemandNode)> {
        self.demand
            .iter()
            .enumerate()
            .map(|(i, n)| (DemandId(i as u32), n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Tick;
    use crate::reason::FlowReason;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_arena_insert_and_lookup() {
        let mut arena = NodeArena::new();

        let s = arena.insert_supply(SupplyNode::new(
            FlowReason::purchase_order(Uuid::new_v4()),
            Decimal::from(40),
            Tick::new(900),
        ));
        let d = arena.insert_demand(DemandNode::new(
            FlowReason::sales_line(Uuid::new_v4()),
            Decimal::from(100),
            Tick::new(1000),
        ));

        assert_eq!(arena.supply_count(), 1);
        assert_eq!(arena.demand_count(), 1);
        assert_eq!(arena.supply(s).body().original_qty(), Decimal::from(40));
        assert_eq!(arena.demand(d).body().date(), Some(Tick::new(1000)));
    }
}
