// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 越线计数引擎 (Crossing Counting Engine)
///
/// - Rules:      方向规则 (入口区域 → 出口区域)
/// - Tracker:    每个追踪ID的越线状态机
/// - Aggregator: 按方向去重计数
pub mod aggregator;
pub mod rules;
pub mod tracker;

pub use aggregator::Counts;
pub use rules::{CrossingRule, Direction};
pub use tracker::{CrossingEvent, CrossingTracker, Observation, RuleState, TrackId, TrackState};
