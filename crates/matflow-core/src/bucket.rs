//! 時間桶
//!
//! 同一時刻的節點歸在同一個桶裡（例如同批共同產出的多個批次）。
//! 空桶不合法，必須由曲線移除。

use crate::clock::Tick;

/// 同一時刻的節點群組
#[derive(Debug, Clone)]
pub struct TimeBucket<I> {
    date: Tick,
    nodes: Vec<I>,
}

impl<I: Copy + Eq> TimeBucket<I> {
    /// 創建帶一個節點的新桶
    pub fn new(date: Tick, id: I) -> Self {
        Self {
            date,
            nodes: vec![id],
        }
    }

    /// 桶時刻（等於桶內所有節點的時刻）
    pub fn date(&self) -> Tick {
        self.date
    }

    pub fn nodes(&self) -> &[I] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 加入一個同時刻節點
    pub fn push(&mut self, id: I) {
        self.nodes.push(id);
    }

    /// 移除指定節點；回傳是否有移除
    pub fn remove(&mut self, id: I) -> bool {
        if let Some(pos) = self.nodes.iter().position(|n| *n == id) {
            self.nodes.remove(pos);
            true
        } else {
            false
        }
    }

    /// 併入另一個同時刻的桶
    pub fn merge(&mut self, mut other: TimeBucket<I>) {
        debug_assert_eq!(self.date, other.date, "不可合併不同時刻的桶");
        self.nodes.append(&mut other.nodes);
    }
}
