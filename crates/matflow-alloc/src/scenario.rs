//! 模擬情境
//!
//! 每個情境獨占自己的節點空間、時鐘與事件清單，
//! 情境內部單執行緒；多個獨立情境以 rayon 平行執行。

use chrono::NaiveDateTime;
use rayon::prelude::*;

use matflow_core::{EventSink, NodeArena, SimClock, Tick};

/// 一個模擬情境的共享狀態
#[derive(Debug)]
pub struct Scenario {
    /// 節點空間
    pub arena: NodeArena,

    /// 模擬時鐘
    pub clock: SimClock,

    /// 未來事件清單
    pub events: EventSink,
}

impl Scenario {
    /// 創建新的情境（時刻零開始）
    pub fn new(base: NaiveDateTime) -> Self {
        Self {
            arena: NodeArena::new(),
            clock: SimClock::new(base),
            events: EventSink::new(),
        }
    }

    /// 推進模擬時鐘
    pub fn advance_to(&mut self, tick: Tick) {
        self.clock.advance_to(tick);
    }
}

/// 平行執行多個獨立情境
///
/// 各情境的狀態互不相交，情境之間沒有任何共享的節點或曲線。
pub fn run_scenarios<S, F>(scenarios: &mut [S], run: F)
where
    S: Send,
    F: Fn(&mut S) + Send + Sync,
{
    scenarios.par_iter_mut().for_each(|scenario| {
        run(scenario);
    });
}
