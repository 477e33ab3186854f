// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测/追踪结果数据结构
//! Data structures consumed from the detection + tracking collaborator

use serde::{Deserialize, Serialize};

use crate::counting::TrackId;
use crate::geometry::Point;

/// 检测框 (整数像素坐标, JSON格式 `[x1, y1, x2, y2]`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 中心点 (向下取整)
    pub fn center(&self) -> Point {
        let cx = (self.x1 as i64 + self.x2 as i64).div_euclid(2);
        let cy = (self.y1 as i64 + self.y2 as i64).div_euclid(2);
        Point::new(cx as i32, cy as i32)
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

impl From<[i32; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BBox> for [i32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// 单个目标 (检测框 + 追踪ID)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub track_id: TrackId,
    #[serde(default)]
    pub class_label: String,
    pub bbox: BBox,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl Detection {
    pub fn new(track_id: TrackId, class_label: impl Into<String>, bbox: BBox, confidence: f32) -> Self {
        Self {
            track_id,
            class_label: class_label.into(),
            bbox,
            confidence,
        }
    }

    /// 观测点: 检测框中心
    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}

/// 一帧内的所有目标
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// 帧序号; 缺省时由读取方按行号补齐
    #[serde(default)]
    pub frame: Option<u64>,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl DetectionFrame {
    pub fn new(frame: u64, detections: Vec<Detection>) -> Self {
        Self {
            frame: Some(frame),
            detections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_floor_division() {
        assert_eq!(BBox::new(0, 0, 11, 21).center(), Point::new(5, 10));
        assert_eq!(BBox::new(-3, -3, 0, 0).center(), Point::new(-2, -2));
        assert_eq!(BBox::new(10, 20, 30, 40).center(), Point::new(20, 30));
    }

    #[test]
    fn test_detection_json() {
        let json = r#"{"track_id":7,"class_label":"car","bbox":[10,20,30,40],"confidence":0.9}"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det.track_id, 7);
        assert_eq!(det.bbox, BBox::new(10, 20, 30, 40));
        assert_eq!(det.center(), Point::new(20, 30));

        let back = serde_json::to_value(&det).unwrap();
        assert_eq!(back["bbox"], serde_json::json!([10, 20, 30, 40]));
    }

    #[test]
    fn test_frame_defaults() {
        let frame: DetectionFrame =
            serde_json::from_str(r#"{"detections":[{"track_id":1,"bbox":[0,0,2,2]}]}"#).unwrap();
        assert_eq!(frame.frame, None);
        assert_eq!(frame.detections[0].confidence, 1.0);
        assert!(frame.detections[0].class_label.is_empty());
    }
}
