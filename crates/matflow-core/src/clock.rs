//! 模擬時鐘與未來事件
//!
//! 模擬以 tick（秒）推進；情境起始時間以 `chrono` 表示，
//! tick 可換算為實際時間供報表使用。
//! 未來事件只是帶時間戳的資料，由呼叫端持有的事件清單收集，
//! 核心本身不做任何延遲執行。

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::arena::SupplyId;

/// 模擬時刻（自情境起始的秒數）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Tick(pub i64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// 創建新的時刻
    pub fn new(value: i64) -> Self {
        Tick(value)
    }

    /// 取得原始值
    pub fn value(self) -> i64 {
        self.0
    }

    /// 位移指定秒數
    pub fn offset(self, seconds: i64) -> Tick {
        Tick(self.0 + seconds)
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// 情境模擬時鐘
#[derive(Debug, Clone)]
pub struct SimClock {
    /// 情境起始時間
    base: NaiveDateTime,

    /// 目前時刻
    now: Tick,
}

impl SimClock {
    /// 創建新的模擬時鐘（自起始時間、時刻零開始）
    pub fn new(base: NaiveDateTime) -> Self {
        Self {
            base,
            now: Tick::ZERO,
        }
    }

    /// 創建指定時刻的模擬時鐘
    pub fn at(base: NaiveDateTime, now: Tick) -> Self {
        Self { base, now }
    }

    /// 目前時刻
    pub fn now(&self) -> Tick {
        self.now
    }

    /// 情境起始時間
    pub fn base(&self) -> NaiveDateTime {
        self.base
    }

    /// 推進到指定時刻（時鐘不可倒退）
    pub fn advance_to(&mut self, tick: Tick) {
        debug_assert!(tick >= self.now, "模擬時鐘不可倒退: {} -> {}", self.now, tick);
        self.now = tick;
    }

    /// 將時刻換算為實際時間
    pub fn datetime_at(&self, tick: Tick) -> NaiveDateTime {
        self.base + Duration::seconds(tick.value())
    }

    /// 目前時刻的實際時間
    pub fn now_datetime(&self) -> NaiveDateTime {
        self.datetime_at(self.now)
    }
}

/// 未來事件種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FutureEventKind {
    /// 供應節點消耗完畢後的棄置檢查
    DisposalCheck { supply: SupplyId },

    /// 儲區占用釋放
    StorageRelease { area: Uuid },
}

/// 未來事件（帶時間戳的資料，推入外部事件清單）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureEvent {
    /// 事件發生時刻
    pub at: Tick,

    /// 事件種類
    pub kind: FutureEventKind,
}

/// 呼叫端持有的未來事件清單
#[derive(Debug, Default, Clone)]
pub struct EventSink {
    events: Vec<FutureEvent>,
}

impl EventSink {
    /// 創建空的事件清單
    pub fn new() -> Self {
        Self::default()
    }

    /// 排入一筆未來事件
    pub fn schedule(&mut self, at: Tick, kind: FutureEventKind) {
        self.events.push(FutureEvent { at, kind });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FutureEvent> {
        self.events.iter()
    }

    /// 取出不晚於指定時刻的事件（依時間排序）
    pub fn drain_until(&mut self, tick: Tick) -> Vec<FutureEvent> {
        let mut due: Vec<FutureEvent> = Vec::new();
        self.events.retain(|e| {
            if e.at <= tick {
                due.push(*e);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|e| e.at);
        due
    }

    pub fn into_inner(self) -> Vec<FutureEvent> {
        self.events
    }
}
