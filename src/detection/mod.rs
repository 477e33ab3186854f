// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测结果接入 (Detection Input)
///
/// 检测与追踪由外部模型完成,这里只定义接口边界:
/// - Types:  检测框 / 追踪ID / 帧
/// - Source: 检测结果来源 (JSON Lines 回放) 与过滤
pub mod source;
pub mod types;

pub use source::{DetectionFilter, DetectionSource, JsonLinesSource};
pub use types::{BBox, Detection, DetectionFrame};
