// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 越线追踪状态机 (Crossing Tracker)
//!
//! 每个追踪ID、每条规则独立维护状态:
//! 1. Idle    初始状态
//! 2. Armed   曾出现在入口区域内
//! 3. Counted 进入入口后到达出口区域,产生一次越线事件 (终态)
//!
//! 计数含义是"曾经越过",没有回到 Idle 的转换,短暂遮挡或往返不会重复计数。

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{info, warn};

use super::rules::{CrossingRule, Direction};
use crate::geometry::Point;
use crate::zones::PolygonStore;

/// 外部追踪器给出的目标ID
pub type TrackId = i64;

/// 单条规则的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleState {
    #[default]
    Idle,
    Armed,
    Counted,
}

/// 越线事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossingEvent {
    pub track_id: TrackId,
    pub direction: Direction,
    /// 帧序号
    pub observed_at: u64,
}

/// 单个追踪ID的状态
#[derive(Debug, Clone)]
pub struct TrackState {
    /// 当前所在区域 (每次观测重新计算)
    pub membership: BTreeSet<String>,

    /// 每条规则的状态 (与规则列表下标对应)
    pub rules: Vec<RuleState>,

    /// 已计数的方向
    pub emitted_directions: BTreeSet<Direction>,

    /// 最后一次出现的帧序号
    pub last_seen: u64,
}

impl TrackState {
    fn new(rule_count: usize, frame: u64) -> Self {
        Self {
            membership: BTreeSet::new(),
            rules: vec![RuleState::Idle; rule_count],
            emitted_directions: BTreeSet::new(),
            last_seen: frame,
        }
    }
}

/// 单次观测结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    /// 本次产生的越线事件
    pub events: Vec<CrossingEvent>,

    /// 已进入过入口、当前位于出口区域的规则方向 (用于高亮显示)
    pub exiting: Vec<Direction>,
}

pub struct CrossingTracker {
    rules: Vec<CrossingRule>,
    tracks: HashMap<TrackId, TrackState>,

    /// 已报告过的缺失区域 (只警告一次)
    missing_zones: BTreeSet<String>,

    /// 缺失区域警告次数
    missing_reports: usize,
}

impl CrossingTracker {
    pub fn new(rules: Vec<CrossingRule>) -> Self {
        for rule in &rules {
            info!("🎯 计数规则: {}", rule);
        }
        Self {
            rules,
            tracks: HashMap::new(),
            missing_zones: BTreeSet::new(),
            missing_reports: 0,
        }
    }

    pub fn rules(&self) -> &[CrossingRule] {
        &self.rules
    }

    /// 检查规则引用的区域是否存在
    ///
    /// 缺失的区域只警告一次,对应规则在区域出现之前永远不会满足。
    pub fn sync_zones(&mut self, store: &PolygonStore) {
        let referenced: BTreeSet<&str> = self
            .rules
            .iter()
            .flat_map(|r| [r.entry.as_str(), r.exit.as_str()])
            .collect();

        for name in referenced {
            if store.zone(name).is_some() {
                if self.missing_zones.remove(name) {
                    info!("✅ 区域 {} 已就绪,相关规则恢复计数", name);
                }
            } else {
                self.missing_reports += report_missing(&mut self.missing_zones, name);
            }
        }
    }

    /// 处理一次观测 (追踪ID在某帧的位置)
    pub fn observe(
        &mut self,
        store: &PolygonStore,
        track_id: TrackId,
        point: Point,
        frame: u64,
    ) -> Observation {
        let rule_count = self.rules.len();
        let state = self
            .tracks
            .entry(track_id)
            .or_insert_with(|| TrackState::new(rule_count, frame));
        state.last_seen = frame;
        state.membership = store
            .zones()
            .iter()
            .filter(|z| z.contains(point))
            .map(|z| z.name.clone())
            .collect();

        let mut observation = Observation::default();

        for (idx, rule) in self.rules.iter().enumerate() {
            for name in [&rule.entry, &rule.exit] {
                if store.zone(name).is_none() {
                    self.missing_reports += report_missing(&mut self.missing_zones, name);
                }
            }

            let in_entry = state.membership.contains(&rule.entry);
            let in_exit = state.membership.contains(&rule.exit);
            let rule_state = &mut state.rules[idx];

            if *rule_state == RuleState::Idle && in_entry {
                *rule_state = RuleState::Armed;
            }

            if *rule_state != RuleState::Idle && in_exit {
                observation.exiting.push(rule.direction);

                if *rule_state == RuleState::Armed {
                    *rule_state = RuleState::Counted;
                    if state.emitted_directions.insert(rule.direction) {
                        observation.events.push(CrossingEvent {
                            track_id,
                            direction: rule.direction,
                            observed_at: frame,
                        });
                    }
                }
            }
        }

        observation
    }

    /// 删除超过 `max_idle` 帧未出现的追踪ID,返回删除数量
    pub fn evict_stale(&mut self, current_frame: u64, max_idle: u64) -> usize {
        let before = self.tracks.len();
        self.tracks
            .retain(|_, t| current_frame.saturating_sub(t.last_seen) <= max_idle);
        before - self.tracks.len()
    }

    pub fn track(&self, track_id: TrackId) -> Option<&TrackState> {
        self.tracks.get(&track_id)
    }

    /// 指定ID在指定规则下的状态; 未见过的ID返回 `Idle`
    pub fn rule_state(&self, track_id: TrackId, rule_idx: usize) -> RuleState {
        self.tracks
            .get(&track_id)
            .and_then(|t| t.rules.get(rule_idx).copied())
            .unwrap_or_default()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// 是否有未解决的配置错误
    pub fn has_missing_zones(&self) -> bool {
        !self.missing_zones.is_empty()
    }

    /// 当前缺失的区域名 (按名称排序)
    pub fn missing_zones(&self) -> Vec<&str> {
        self.missing_zones.iter().map(String::as_str).collect()
    }

    /// 累计发出的缺失区域警告数
    pub fn missing_reports(&self) -> usize {
        self.missing_reports
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.missing_zones.clear();
    }
}

// 首次发现时警告,返回新增的警告数
fn report_missing(missing: &mut BTreeSet<String>, name: &str) -> usize {
    if missing.insert(name.to_string()) {
        warn!("⚠️ 配置错误: 区域 {} 不存在,相关规则暂停计数", name);
        1
    } else {
        0
    }
}
