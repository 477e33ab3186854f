// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 计数流水线 (Counting Pipeline)
///
/// 两线程架构,通过 crossbeam 通道通信:
/// - Source:  检测结果来源 (独立线程)
/// - Counter: 区域判定 + 越线计数 (计数线程, 独占区域存储与追踪状态)
///
/// 绘制命令在两帧之间执行,每帧看到的区域集合是一致的。
pub mod counter;
pub mod runner;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::counting::{CrossingEvent, Direction, TrackId};
use crate::detection::BBox;
use crate::geometry::Point;
use crate::zones::Zone;

pub use counter::CountingPipeline;
pub use runner::{spawn_source, RunSummary};

// ========== 流水线消息类型 ==========

/// 高亮目标: 已进入入口、当前位于出口区域
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Highlight {
    pub track_id: TrackId,
    pub class_label: String,
    pub bbox: BBox,
    pub direction: Direction,
}

/// 单帧处理结果 (计数线程 → 渲染/输出)
#[derive(Clone, Debug, Default, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub events: Vec<CrossingEvent>,
    pub highlights: Vec<Highlight>,
    pub counts: BTreeMap<Direction, usize>,
}

/// 叠加层数据 (供渲染使用)
#[derive(Clone, Debug, Default, Serialize)]
pub struct Overlay {
    /// 已完成的区域轮廓
    pub zones: Vec<Zone>,
    /// 正在绘制中的顶点
    pub pending: Vec<Point>,
    pub counts: BTreeMap<Direction, usize>,
}

impl Overlay {
    /// 计数文字, 例如 `Moving Up: 3`
    pub fn count_lines(&self) -> Vec<String> {
        self.counts
            .iter()
            .map(|(d, n)| format!("Moving {}: {}", d, n))
            .collect()
    }
}
