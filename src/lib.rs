//! # Matflow
//!
//! 製造排程模擬的物料流核心：時序數量曲線、兩輪供需比對、
//! 分配生命週期與輔助產能曲線。
//!
//! ## 模組
//!
//! - [`matflow_core`]：節點、時間桶、時序曲線與分配政策
//! - [`matflow_alloc`]：比對演算法、供需曲線生命週期與情境執行
//!
//! ## 快速開始
//!
//! ```
//! use matflow::core::{FlowReason, NodeArena, NoRestrictions, SimClock, SupplyNode, Tick};
//! use matflow::alloc::{allocate, MatchRequest, SupplyProfile};
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//! use uuid::Uuid;
//!
//! let mut arena = NodeArena::new();
//! let mut supply = SupplyProfile::new();
//! supply
//!     .add(
//!         &mut arena,
//!         SupplyNode::new(
//!             FlowReason::purchase_order(Uuid::new_v4()),
//!             Decimal::from(40),
//!             Tick::new(900),
//!         ),
//!     )
//!     .unwrap();
//!
//! let demand = arena.insert_demand(matflow::core::DemandNode::new(
//!     FlowReason::sales_line(Uuid::new_v4()),
//!     Decimal::from(25),
//!     Tick::new(1000),
//! ));
//!
//! let base = NaiveDate::from_ymd_opt(2025, 11, 1)
//!     .unwrap()
//!     .and_hms_opt(0, 0, 0)
//!     .unwrap();
//! let clock = SimClock::at(base, Tick::new(1000));
//!
//! let unmet = allocate(
//!     &mut arena,
//!     &supply,
//!     demand,
//!     &clock,
//!     &NoRestrictions,
//!     &MatchRequest::commit(Decimal::from(25)),
//! );
//! assert_eq!(unmet, Decimal::ZERO);
//! ```

pub use matflow_alloc as alloc;
pub use matflow_core as core;
