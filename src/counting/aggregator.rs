// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 计数汇总: 每个方向保存去重后的追踪ID集合,计数即集合大小。

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::rules::Direction;
use super::tracker::{CrossingEvent, TrackId};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Counts {
    by_direction: BTreeMap<Direction, BTreeSet<TrackId>>,
}

impl Counts {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置方向 (即使计数为0也出现在快照中)
    pub fn with_directions(directions: impl IntoIterator<Item = Direction>) -> Self {
        Self {
            by_direction: directions
                .into_iter()
                .map(|d| (d, BTreeSet::new()))
                .collect(),
        }
    }

    /// 记录越线事件; 重复的 (ID, 方向) 不改变计数,返回是否为新记录
    pub fn record(&mut self, event: &CrossingEvent) -> bool {
        self.by_direction
            .entry(event.direction)
            .or_default()
            .insert(event.track_id)
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.by_direction
            .get(&direction)
            .map(BTreeSet::len)
            .unwrap_or(0)
    }

    /// 当前各方向计数
    pub fn snapshot(&self) -> BTreeMap<Direction, usize> {
        self.by_direction
            .iter()
            .map(|(d, ids)| (*d, ids.len()))
            .collect()
    }

    pub fn track_ids(&self, direction: Direction) -> impl Iterator<Item = TrackId> + '_ {
        self.by_direction
            .get(&direction)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    pub fn total(&self) -> usize {
        self.by_direction.values().map(BTreeSet::len).sum()
    }
}
