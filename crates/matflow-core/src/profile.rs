//! 時序數量曲線
//!
//! 曲線是依時刻嚴格遞增排序的時間桶序列，屬於單一供需來源。
//! 支援有序插入、時刻查找、合併、區間轉移（所有權轉移而非複製）、
//! 以及可中斷續走的雙向走訪。
//!
//! 結構不變量（除錯組建檢查）：桶時刻嚴格遞增、不存在空桶。

use crate::bucket::TimeBucket;
use crate::clock::Tick;
use crate::{FlowError, Result};

/// 走訪方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    /// 由舊到新
    Forward,
    /// 由新到舊
    Reverse,
}

/// 時序數量曲線
#[derive(Debug, Clone)]
pub struct QuantityProfile<I> {
    buckets: Vec<TimeBucket<I>>,
}

// 代號類型不需實作 Default
impl<I> Default for QuantityProfile<I> {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
        }
    }
}

impl<I: Copy + Eq> QuantityProfile<I> {
    /// 創建空曲線
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
        }
    }

    /// 桶數量
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// 節點總數
    pub fn node_count(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn buckets(&self) -> &[TimeBucket<I>] {
        &self.buckets
    }

    pub fn first(&self) -> Option<&TimeBucket<I>> {
        self.buckets.first()
    }

    pub fn last(&self) -> Option<&TimeBucket<I>> {
        self.buckets.last()
    }

    fn position(&self, date: Tick) -> std::result::Result<usize, usize> {
        self.buckets.binary_search_by(|b| b.date().cmp(&date))
    }

    /// 有序插入：已有同時刻的桶則併入，否則建立新桶
    pub fn insert(&mut self, date: Tick, id: I) {
        match self.position(date) {
            Ok(i) => self.buckets[i].push(id),
            Err(i) => self.buckets.insert(i, TimeBucket::new(date, id)),
        }
    }

    /// 加到尾端；要求 `date` 不早於最後一桶
    pub fn push_back(&mut self, date: Tick, id: I) -> Result<()> {
        if let Some(last) = self.buckets.last_mut() {
            if date < last.date() {
                debug_assert!(false, "尾端插入時刻 {} 早於最後一桶 {}", date, last.date());
                return Err(FlowError::OrderingViolation {
                    last: last.date(),
                    new: date,
                });
            }
            if date == last.date() {
                last.push(id);
                return Ok(());
            }
        }
        self.buckets.push(TimeBucket::new(date, id));
        Ok(())
    }

    /// 加到前端；要求 `date` 不晚於第一桶
    pub fn push_front(&mut self, date: Tick, id: I) -> Result<()> {
        if let Some(first) = self.buckets.first_mut() {
            if date > first.date() {
                debug_assert!(false, "前端插入時刻 {} 晚於第一桶 {}", date, first.date());
                return Err(FlowError::OrderingViolation {
                    last: first.date(),
                    new: date,
                });
            }
            if date == first.date() {
                first.push(id);
                return Ok(());
            }
        }
        self.buckets.insert(0, TimeBucket::new(date, id));
        Ok(())
    }

    /// 精確時刻查找
    pub fn find_by_time(&self, date: Tick) -> Option<&TimeBucket<I>> {
        self.position(date).ok().map(|i| &self.buckets[i])
    }

    /// 自游標位置起的精確時刻查找（循序掃描時攤平成本）
    pub fn find_by_time_from(&self, cursor: usize, date: Tick) -> Option<(usize, &TimeBucket<I>)> {
        self.buckets
            .iter()
            .enumerate()
            .skip(cursor)
            .take_while(|(_, b)| b.date() <= date)
            .find(|(_, b)| b.date() == date)
    }

    /// 不晚於指定時刻的最後一桶（由新到舊走訪的起點）
    pub fn find_at_or_before(&self, date: Tick) -> Option<usize> {
        match self.position(date) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    /// 依索引取桶
    pub fn bucket_at(&self, index: usize) -> Option<&TimeBucket<I>> {
        self.buckets.get(index)
    }

    /// 併入另一條曲線：同時刻的桶合併，其餘有序插入。
    /// `other` 的桶被重新連結（非複製），呼叫後邏輯上為空。
    pub fn merge(&mut self, other: &mut QuantityProfile<I>) {
        for bucket in other.buckets.drain(..) {
            match self.position(bucket.date()) {
                Ok(i) => self.buckets[i].merge(bucket),
                Err(i) => self.buckets.insert(i, bucket),
            }
        }
    }

    /// 將 `other` 在 `[start, end]` 區間內的桶轉移到本曲線
    /// （所有權轉移），回傳被轉移的節點
    pub fn transfer_range(
        &mut self,
        other: &mut QuantityProfile<I>,
        start: Tick,
        end: Tick,
    ) -> Vec<I> {
        let mut moved = Vec::new();
        let mut kept = Vec::with_capacity(other.buckets.len());
        for bucket in other.buckets.drain(..) {
            if bucket.date() >= start && bucket.date() <= end {
                moved.extend(bucket.nodes().iter().copied());
                match self.position(bucket.date()) {
                    Ok(i) => self.buckets[i].merge(bucket),
                    Err(i) => self.buckets.insert(i, bucket),
                }
            } else {
                kept.push(bucket);
            }
        }
        other.buckets = kept;
        moved
    }

    /// 整條曲線轉移
    pub fn transfer_all(&mut self, other: &mut QuantityProfile<I>) -> Vec<I> {
        self.transfer_range(other, Tick(i64::MIN), Tick(i64::MAX))
    }

    /// 轉移不晚於模擬時鐘的部分
    pub fn transfer_until(&mut self, clock: Tick, other: &mut QuantityProfile<I>) -> Vec<I> {
        self.transfer_range(other, Tick(i64::MIN), clock)
    }

    /// 自桶中移除節點；桶變空時一併移除。回傳是否有移除。
    pub fn remove(&mut self, date: Tick, id: I) -> bool {
        if let Ok(i) = self.position(date) {
            let removed = self.buckets[i].remove(id);
            if self.buckets[i].is_empty() {
                self.buckets.remove(i);
            }
            removed
        } else {
            false
        }
    }

    /// 清空曲線，回傳所有被拆下的節點
    pub fn clear(&mut self) -> Vec<I> {
        let ids = self.iter_nodes().map(|(_, id)| id).collect();
        self.buckets.clear();
        ids
    }

    /// 由舊到新走訪所有 (時刻, 節點)
    pub fn iter_nodes(&self) -> impl Iterator<Item = (Tick, I)> + '_ {
        self.buckets
            .iter()
            .flat_map(|b| b.nodes().iter().map(move |id| (b.date(), *id)))
    }

    /// 結構不變量檢查（僅測試／除錯組建使用）
    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) {
        for bucket in &self.buckets {
            assert!(!bucket.is_empty(), "曲線中殘留空桶: {}", bucket.date());
        }
        for pair in self.buckets.windows(2) {
            assert!(
                pair[0].date() < pair[1].date(),
                "桶時刻未嚴格遞增: {} ≥ {}",
                pair[0].date(),
                pair[1].date()
            );
        }
    }
}

/// 可中斷續走的方向性游標
///
/// 游標僅持有索引，不借用曲線，走訪可隨時中斷後續走；
/// 第二輪比對前以 [`ProfileCursor::restart`] 回到起點。
/// 曲線結構變動後游標即失效，須重新建立。
#[derive(Debug, Clone)]
pub struct ProfileCursor {
    direction: TraversalDirection,
    origin: Option<usize>,
    state: CursorState,
}

#[derive(Debug, Clone, Copy)]
enum CursorState {
    Unstarted,
    At { bucket: usize, node: usize },
    Done,
}

impl ProfileCursor {
    /// 創建游標；`origin` 為起始桶索引，未指定時
    /// 正向自第一桶、反向自最後一桶開始
    pub fn new(direction: TraversalDirection, origin: Option<usize>) -> Self {
        Self {
            direction,
            origin,
            state: CursorState::Unstarted,
        }
    }

    /// 由舊到新，自第一桶開始
    pub fn oldest_first() -> Self {
        Self::new(TraversalDirection::Forward, None)
    }

    /// 由新到舊，自最後一桶開始
    pub fn newest_first() -> Self {
        Self::new(TraversalDirection::Reverse, None)
    }

    /// 由新到舊，自指定桶開始
    pub fn newest_first_from(bucket: usize) -> Self {
        Self::new(TraversalDirection::Reverse, Some(bucket))
    }

    /// 回到起點（第二輪比對前重設游標）
    pub fn restart(&mut self) {
        self.state = CursorState::Unstarted;
    }

    /// 取下一個節點；走訪完畢回傳 `None`
    pub fn next<I: Copy + Eq>(&mut self, profile: &QuantityProfile<I>) -> Option<I> {
        let next_pos = match self.state {
            CursorState::Done => None,
            CursorState::Unstarted => self.first_pos(profile),
            CursorState::At { bucket, node } => self.advance(profile, bucket, node),
        };
        match next_pos {
            Some((bucket, node)) => {
                self.state = CursorState::At { bucket, node };
                Some(profile.buckets[bucket].nodes()[node])
            }
            None => {
                self.state = CursorState::Done;
                None
            }
        }
    }

    fn first_pos<I: Copy + Eq>(&self, profile: &QuantityProfile<I>) -> Option<(usize, usize)> {
        if profile.is_empty() {
            return None;
        }
        match self.direction {
            TraversalDirection::Forward => {
                let b = self.origin.unwrap_or(0);
                (b < profile.bucket_count()).then_some((b, 0))
            }
            TraversalDirection::Reverse => {
                let b = self.origin.unwrap_or(profile.bucket_count() - 1);
                (b < profile.bucket_count()).then(|| (b, profile.buckets[b].len() - 1))
            }
        }
    }

    fn advance<I: Copy + Eq>(
        &self,
        profile: &QuantityProfile<I>,
        bucket: usize,
        node: usize,
    ) -> Option<(usize, usize)> {
        match self.direction {
            TraversalDirection::Forward => {
                if node + 1 < profile.buckets[bucket].len() {
                    Some((bucket, node + 1))
                } else if bucket + 1 < profile.bucket_count() {
                    Some((bucket + 1, 0))
                } else {
                    None
                }
            }
            TraversalDirection::Reverse => {
                if node > 0 {
                    Some((bucket, node - 1))
                } else if bucket > 0 {
                    Some((bucket - 1, profile.buckets[bucket - 1].len() - 1))
                } else {
                    None
                }
            }
        }
    }
}
