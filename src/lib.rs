// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 计数配置参数
pub mod counting; // 越线计数引擎
pub mod detection; // 外部检测/追踪结果接入
pub mod error; // 错误类型
pub mod geometry; // 点在多边形内判定
pub mod pipeline; // 逐帧计数流水线
pub mod zones; // 区域多边形管理

pub use crate::config::CounterConfig;
pub use crate::counting::{
    Counts, CrossingEvent, CrossingRule, CrossingTracker, Direction, RuleState, TrackId,
};
pub use crate::detection::{Detection, DetectionFrame};
pub use crate::error::{Result, ZoneError};
pub use crate::geometry::{contains, Point};
pub use crate::pipeline::{CountingPipeline, FrameReport, Highlight, Overlay};
pub use crate::zones::{AuthoringCommand, PolygonStore, Zone};

/// 生成时间字符串 (报告时间戳)
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
