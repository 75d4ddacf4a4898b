//! # Matflow Allocation Engine
//!
//! 時序數量分配演算法：兩輪供需比對、需求曲線展開與生命週期、
//! 供應曲線與儲區分配、產能與週期輔助曲線、情境平行執行。

pub mod capacity;
pub mod cycle;
pub mod demand;
pub mod matching;
pub mod scenario;
pub mod supply;

// Re-export 主要類型
pub use capacity::{CapacityCategory, CapacityUsage, CapacityUsageProfile};
pub use cycle::{CycleAdjustment, CycleAdjustmentProfile};
pub use demand::{
    ActivityTiming, Adjustment, DemandProfile, DemandRequirement, MaterialTiming,
};
pub use matching::{allocate, MatchMode, MatchRequest};
pub use scenario::{run_scenarios, Scenario};
pub use supply::SupplyProfile;
