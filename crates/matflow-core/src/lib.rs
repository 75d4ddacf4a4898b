//! # Matflow Core
//!
//! 物料流核心資料模型：節點、時間桶、時序數量曲線與分配政策

pub mod arena;
pub mod bucket;
pub mod clock;
pub mod node;
pub mod policy;
pub mod profile;
pub mod qty;
pub mod reason;

// Re-export 主要類型
pub use arena::{DemandId, NodeArena, SupplyId};
pub use bucket::TimeBucket;
pub use clock::{EventSink, FutureEvent, FutureEventKind, SimClock, Tick};
pub use node::{
    Allocation, DemandNode, DemandPhase, LeadTimeAllocation, NodeBody, ShortageAllocation,
    StorageAllocation, SupplyNode,
};
pub use policy::{AllocationDirection, EligibilityPolicy, NoRestrictions, StorageArea};
pub use profile::{ProfileCursor, QuantityProfile, TraversalDirection};
pub use reason::FlowReason;

/// 物料流錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("節點時刻已設定，不可變更")]
    DateAlreadySet,

    #[error("節點尚未設定時刻")]
    DateNotSet,

    #[error("時間順序違規：新桶 {new} 與既有桶 {last} 衝突")]
    OrderingViolation { last: clock::Tick, new: clock::Tick },

    #[error("分配數量 {requested} 超過未分配數量 {available}")]
    OverAllocation {
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("其他錯誤: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
